//! `PackageManager`: resolve a version against an ordered list of
//! package servers, fetch the archive, and extract it into the cache.

use crate::ci_build::CiBuildClient;
use crate::error::{Error, Result};
use crate::fetcher::Fetcher;
use fhirsmith_layout::Layout;
use fhirsmith_versioning as version;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Deserialize)]
struct VersionsResponse {
    #[serde(default)]
    versions: HashMap<String, serde_json::Value>,
}

pub struct PackageManager {
    fetcher: Arc<Fetcher>,
    servers: Vec<String>,
    layout: Layout,
    ci_build: CiBuildClient,
    resolved_cache: Mutex<HashMap<(String, String), String>>,
}

impl PackageManager {
    pub fn new(servers: Vec<String>, layout: Layout) -> Self {
        let fetcher = Arc::new(Fetcher::new());
        Self {
            ci_build: CiBuildClient::new(fetcher.clone()),
            fetcher,
            servers,
            layout,
            resolved_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve `(package_id, version_criteria)` to an extracted cache
    /// directory name (not an absolute path), fetching and extracting
    /// the archive if it is not already cached.
    pub async fn fetch(&self, package_id: &str, version_criteria: Option<&str>) -> Result<String> {
        let criteria_key = version_criteria.unwrap_or("").to_string();

        let resolved_version = if version_criteria.map(version::has_wildcards).unwrap_or(true)
            || version_criteria.is_none()
        {
            self.resolve_version(package_id, version_criteria).await?
        } else {
            version_criteria.unwrap().to_string()
        };

        if self.layout.has_package(package_id, &resolved_version) {
            return Ok(Layout::package_dir_name(package_id, &resolved_version));
        }

        if resolved_version == "current" || resolved_version.starts_with("current$") {
            return self
                .fetch_ci_build(package_id, &resolved_version)
                .await;
        }

        self.fetch_pinned(package_id, &resolved_version).await?;

        self.resolved_cache
            .lock()
            .unwrap()
            .insert((package_id.to_string(), criteria_key), resolved_version.clone());

        Ok(Layout::package_dir_name(package_id, &resolved_version))
    }

    async fn resolve_version(&self, package_id: &str, criteria: Option<&str>) -> Result<String> {
        let key = (package_id.to_string(), criteria.unwrap_or("").to_string());
        if let Some(cached) = self.resolved_cache.lock().unwrap().get(&key).cloned() {
            return Ok(cached);
        }

        for server in &self.servers {
            let url = format!("{}/{}", server.trim_end_matches('/'), package_id);
            let Ok(value) = self.fetcher.get_json(&url).await else {
                continue;
            };
            let Ok(parsed) = serde_json::from_value::<VersionsResponse>(value) else {
                continue;
            };
            if parsed.versions.is_empty() {
                continue;
            }

            let candidates: Vec<&String> = parsed.versions.keys().collect();
            let best = match criteria {
                Some(c) if !c.is_empty() => candidates
                    .into_iter()
                    .filter(|v| version::matches(c, v))
                    .max_by(|a, b| version::compare_str(a, b).map(into_ordering).unwrap_or(std::cmp::Ordering::Equal)),
                _ => candidates
                    .into_iter()
                    .max_by(|a, b| version::compare_str(a, b).map(into_ordering).unwrap_or(std::cmp::Ordering::Equal)),
            };

            if let Some(best) = best {
                let resolved = best.clone();
                self.resolved_cache.lock().unwrap().insert(key, resolved.clone());
                return Ok(resolved);
            }
        }

        Err(Error::VersionUnresolved {
            package_id: package_id.to_string(),
            criteria: criteria.unwrap_or("*").to_string(),
        })
    }

    async fn fetch_pinned(&self, package_id: &str, version: &str) -> Result<()> {
        let mut last_err = None;
        for server in &self.servers {
            let url = format!(
                "{}/{}/{}",
                server.trim_end_matches('/'),
                package_id,
                version
            );
            match self.fetcher.get_bytes(&url, "application/tar+gzip").await {
                Ok(bytes) => {
                    self.extract_into_cache(package_id, version, &bytes)?;
                    return Ok(());
                }
                Err(e) => {
                    last_err = Some(e);
                    continue;
                }
            }
        }

        match last_err {
            Some(source) => Err(Error::NetworkError {
                package_id: package_id.to_string(),
                source,
            }),
            None => Err(Error::PackageNotFound {
                package_id: package_id.to_string(),
                version: version.to_string(),
            }),
        }
    }

    async fn fetch_ci_build(&self, package_id: &str, resolved_version: &str) -> Result<String> {
        let branch = resolved_version
            .strip_prefix("current$")
            .filter(|b| !b.is_empty());

        let primary = self.ci_build.tarball_url(package_id, branch).await?;
        let bytes = match self.fetcher.get_bytes(&primary, "application/tar+gzip").await {
            Ok(bytes) => bytes,
            Err(_) if branch.is_none() => {
                let fallback = self.ci_build.fallback_tarball_url(package_id).await?;
                self.fetcher
                    .get_bytes(&fallback, "application/tar+gzip")
                    .await
                    .map_err(|source| Error::NetworkError {
                        package_id: package_id.to_string(),
                        source,
                    })?
            }
            Err(source) => {
                return Err(Error::NetworkError {
                    package_id: package_id.to_string(),
                    source,
                })
            }
        };

        self.extract_into_cache(package_id, resolved_version, &bytes)?;
        Ok(Layout::package_dir_name(package_id, resolved_version))
    }

    fn extract_into_cache(&self, package_id: &str, version: &str, bytes: &[u8]) -> Result<()> {
        let final_dir = self.layout.package_path(package_id, version);
        let staging_dir = self.layout.package_staging_path(package_id, version);
        fhirsmith_package::extract_tar_gz(bytes, &staging_dir, &final_dir).map_err(|e| {
            Error::ExtractFailed {
                package_id: package_id.to_string(),
                version: version.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

fn into_ordering(i: i32) -> std::cmp::Ordering {
    i.cmp(&0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn build_tarball() -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let encoder = flate2::write::GzEncoder::new(&mut buf, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            let manifest = br#"{"name":"demo.pkg","version":"1.0.0","fhirVersions":["4.0.1"]}"#;
            let mut header = tar::Header::new_gnu();
            header.set_size(manifest.len() as u64);
            header.set_cksum();
            builder
                .append_data(&mut header, "package/package.json", &manifest[..])
                .unwrap();
            builder.finish().unwrap();
        }
        buf
    }

    #[tokio::test]
    async fn resolves_wildcard_version_and_downloads() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/demo.pkg"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "versions": { "1.0.0": {}, "1.2.0": {}, "2.0.0": {} }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/demo.pkg/1.2.0"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(build_tarball()))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::at(tmp.path());
        layout.ensure().unwrap();
        let pm = PackageManager::new(vec![server.uri()], layout.clone());

        let dir_name = pm.fetch("demo.pkg", Some("1.2.x")).await.unwrap();
        assert_eq!(dir_name, "demo.pkg#1.2.0");
        assert!(layout.has_package("demo.pkg", "1.2.0"));

        // Second call for the same criteria hits neither server endpoint.
        server.reset().await;
        let dir_name = pm.fetch("demo.pkg", Some("1.2.x")).await.unwrap();
        assert_eq!(dir_name, "demo.pkg#1.2.0");
    }

    #[tokio::test]
    async fn falls_back_to_next_server_on_404() {
        let first = MockServer::start().await;
        let second = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/demo.pkg/1.0.0"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&first)
            .await;
        Mock::given(method("GET"))
            .and(path("/demo.pkg/1.0.0"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(build_tarball()))
            .mount(&second)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::at(tmp.path());
        layout.ensure().unwrap();
        let pm = PackageManager::new(vec![first.uri(), second.uri()], layout.clone());

        let dir_name = pm.fetch("demo.pkg", Some("1.0.0")).await.unwrap();
        assert_eq!(dir_name, "demo.pkg#1.0.0");
        assert!(layout.has_package("demo.pkg", "1.0.0"));
    }

    #[tokio::test]
    async fn unresolvable_criteria_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/demo.pkg"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "versions": { "1.0.0": {} }
            })))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::at(tmp.path());
        layout.ensure().unwrap();
        let pm = PackageManager::new(vec![server.uri()], layout);

        let err = pm.fetch("demo.pkg", Some("9.x")).await.unwrap_err();
        assert!(matches!(err, Error::VersionUnresolved { .. }));
    }
}
