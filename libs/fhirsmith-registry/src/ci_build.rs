//! Resolves `current`/`current$<branch>` pseudo-versions against the
//! HL7 continuous-build index (`/ig/qas.json`).

use crate::error::{Error, Result};
use crate::fetcher::Fetcher;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const QAS_URL: &str = "https://build.fhir.org/ig/qas.json";
const QAS_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Deserialize)]
struct QasEntry {
    #[serde(rename = "package-id")]
    package_id: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    repo: Option<String>,
}

struct Index {
    fetched_at: Instant,
    build_url_by_package: HashMap<String, String>,
}

/// Caches the qas.json index and resolves CI build download URLs.
pub struct CiBuildClient {
    fetcher: std::sync::Arc<Fetcher>,
    qas_url: String,
    cached: Mutex<Option<Index>>,
}

impl CiBuildClient {
    pub fn new(fetcher: std::sync::Arc<Fetcher>) -> Self {
        Self {
            fetcher,
            qas_url: QAS_URL.to_string(),
            cached: Mutex::new(None),
        }
    }

    #[cfg(test)]
    pub fn with_qas_url(fetcher: std::sync::Arc<Fetcher>, qas_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            qas_url: qas_url.into(),
            cached: Mutex::new(None),
        }
    }

    /// The base CI build URL registered for `package_id`, refreshing the
    /// qas.json index if it is missing or older than an hour.
    pub async fn build_base_url(&self, package_id: &str) -> Result<Option<String>> {
        self.refresh_if_stale().await?;
        let cached = self.cached.lock().unwrap();
        Ok(cached
            .as_ref()
            .and_then(|idx| idx.build_url_by_package.get(package_id).cloned()))
    }

    async fn refresh_if_stale(&self) -> Result<()> {
        let needs_refresh = {
            let cached = self.cached.lock().unwrap();
            match cached.as_ref() {
                Some(idx) => idx.fetched_at.elapsed() > QAS_TTL,
                None => true,
            }
        };
        if !needs_refresh {
            return Ok(());
        }

        let mut entries: Vec<QasEntry> = match self.fetcher.get_json(&self.qas_url).await {
            Ok(value) => serde_json::from_value(value)
                .map_err(|e| Error::CiBuildUnavailable(e.to_string()))?,
            Err(e) => return Err(Error::CiBuildUnavailable(e.to_string())),
        };

        entries.sort_by(|a, b| parse_qas_date(&b.date).cmp(&parse_qas_date(&a.date)));

        let mut build_url_by_package = HashMap::new();
        for entry in entries {
            let base = entry
                .url
                .or(entry.repo)
                .map(|u| u.trim_end_matches('/').to_string());
            if let Some(base) = base {
                build_url_by_package.entry(entry.package_id).or_insert(base);
            }
        }

        *self.cached.lock().unwrap() = Some(Index {
            fetched_at: Instant::now(),
            build_url_by_package,
        });
        Ok(())
    }

    /// Resolve the tarball URL to download for a `current`/`current$branch`
    /// request. `id` may carry an `.r3`/`.r4`/`.r4b`/`.r5`/`.r6` suffix,
    /// in which case the parent package's build base is used with `id`
    /// itself as the filename.
    pub async fn tarball_url(&self, id: &str, branch: Option<&str>) -> Result<String> {
        let (lookup_id, filename_override) = split_version_suffixed_id(id);

        let base = match self.build_base_url(lookup_id).await? {
            Some(base) => base,
            None if id.starts_with("hl7.fhir.r6") => {
                "https://build.fhir.org".to_string()
            }
            None => {
                return Err(Error::CiBuildUnavailable(format!(
                    "no CI build registered for '{id}'"
                )))
            }
        };

        let url = match (branch, filename_override) {
            (Some(branch), _) => format!("{base}/branches/{branch}/package.tgz"),
            (None, Some(filename)) => format!("{base}/{filename}"),
            (None, None) => format!("{base}/package.tgz"),
        };
        Ok(url)
    }

    /// The fallback URL to try when the primary `tarball_url` 404s and
    /// no branch was requested: `{base}/branches/main/package.tgz`.
    pub async fn fallback_tarball_url(&self, id: &str) -> Result<String> {
        let (lookup_id, _) = split_version_suffixed_id(id);
        let base = self
            .build_base_url(lookup_id)
            .await?
            .ok_or_else(|| Error::CiBuildUnavailable(format!("no CI build registered for '{id}'")))?;
        Ok(format!("{base}/branches/main/package.tgz"))
    }
}

/// `hl7.fhir.us.core.r4` → (`hl7.fhir.us.core`, Some("hl7.fhir.us.core.r4.tgz"))
fn split_version_suffixed_id(id: &str) -> (&str, Option<String>) {
    for suffix in [".r2", ".r2b", ".r3", ".r4", ".r4b", ".r5", ".r6"] {
        if let Some(parent) = id.strip_suffix(suffix) {
            return (parent, Some(format!("{id}.tgz")));
        }
    }
    (id, None)
}

/// A synthetic version string for a branch build, per spec: non-null
/// branch yields `current$<branch>`.
pub fn synthetic_branch_version(branch: &str) -> String {
    format!("current${branch}")
}

fn parse_qas_date(date: &Option<String>) -> DateTime<Utc> {
    let Some(date) = date else {
        return DateTime::<Utc>::from_timestamp(0, 0).unwrap();
    };
    for format in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%d"] {
        if let Ok(parsed) = DateTime::parse_from_str(date, format) {
            return parsed.with_timezone(&Utc);
        }
        if format == "%Y-%m-%d" {
            if let Ok(naive) = chrono::NaiveDate::parse_from_str(date, format) {
                return DateTime::from_naive_utc_and_offset(
                    naive.and_hms_opt(0, 0, 0).unwrap(),
                    Utc,
                );
            }
        }
        if format == "%Y-%m-%dT%H:%M:%SZ" {
            if let Ok(naive) =
                chrono::NaiveDateTime::parse_from_str(date.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S")
            {
                return DateTime::from_naive_utc_and_offset(naive, Utc);
            }
        }
    }
    tracing::warn!(date = %date, "unparsable qas.json date, sorting last");
    DateTime::<Utc>::from_timestamp(0, 0).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_fhir_version_suffixed_ids() {
        let (parent, filename) = split_version_suffixed_id("hl7.fhir.us.core.r4");
        assert_eq!(parent, "hl7.fhir.us.core");
        assert_eq!(filename, Some("hl7.fhir.us.core.r4.tgz".to_string()));

        let (parent, filename) = split_version_suffixed_id("hl7.fhir.us.core");
        assert_eq!(parent, "hl7.fhir.us.core");
        assert_eq!(filename, None);
    }

    #[test]
    fn synthetic_version_format() {
        assert_eq!(synthetic_branch_version("main"), "current$main");
    }

    #[test]
    fn date_parsing_accepts_all_three_grammars() {
        let d1 = parse_qas_date(&Some("2024-01-02".to_string()));
        let d2 = parse_qas_date(&Some("2024-01-02T03:04:05Z".to_string()));
        let d3 = parse_qas_date(&Some("2024-01-02T03:04:05+00:00".to_string()));
        assert!(d1.timestamp() > 0);
        assert!(d2 > d1);
        assert_eq!(d2, d3);
    }

    #[test]
    fn unparsable_date_sorts_as_epoch() {
        let d = parse_qas_date(&Some("not-a-date".to_string()));
        assert_eq!(d.timestamp(), 0);
        let d = parse_qas_date(&None);
        assert_eq!(d.timestamp(), 0);
    }
}
