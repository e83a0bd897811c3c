//! A ResourceCatalog populated by paginated, HTTP Basic-authenticated
//! fetches against a remote FHIR server (VSAC), refreshed on a
//! configurable interval with at most one refresh cycle in flight.

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::kind::Kind;
use reqwest::Client;
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

pub struct VsacCatalog {
    catalog: Catalog,
    client: Client,
    base_url: String,
    api_key: String,
    refreshing: Arc<AtomicBool>,
}

impl VsacCatalog {
    pub async fn open(db_path: &Path, base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let catalog = Catalog::open(db_path, Kind::ValueSet).await?;
        Ok(Self {
            catalog,
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            refreshing: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Run one refresh cycle: page through `GET /ValueSet` bundles,
    /// upserting any entry not already cached and merely bumping
    /// `last_seen` for ones that are, then reclaim anything not seen
    /// this cycle. Refresh is serialized; a concurrent call while one
    /// is already in flight is a no-op.
    pub async fn refresh(&self, cycle_start: i64) -> Result<()> {
        if self
            .refreshing
            .compare_exchange(false, true, AtomicOrdering::SeqCst, AtomicOrdering::SeqCst)
            .is_err()
        {
            tracing::debug!("VSAC refresh already in flight, skipping");
            return Ok(());
        }

        let result = self.run_refresh_cycle(cycle_start).await;
        self.refreshing.store(false, AtomicOrdering::SeqCst);
        result
    }

    async fn run_refresh_cycle(&self, cycle_start: i64) -> Result<()> {
        let mut next_url = Some(format!(
            "{}/ValueSet?_offset=0&_count=100",
            self.base_url.trim_end_matches('/')
        ));

        while let Some(url) = next_url.take() {
            let bundle: Value = self
                .client
                .get(&url)
                .basic_auth("apikey", Some(&self.api_key))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            let entries = bundle
                .get("entry")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            for entry in entries {
                let Some(resource) = entry.get("resource") else {
                    continue;
                };
                self.upsert_or_touch(resource, cycle_start).await?;
            }

            next_url = bundle
                .get("link")
                .and_then(Value::as_array)
                .and_then(|links| {
                    links
                        .iter()
                        .find(|l| l.get("relation").and_then(Value::as_str) == Some("next"))
                })
                .and_then(|l| l.get("url"))
                .and_then(Value::as_str)
                .map(str::to_string);
        }

        self.catalog.delete_older_than(cycle_start).await?;
        Ok(())
    }

    async fn upsert_or_touch(&self, resource: &Value, last_seen: i64) -> Result<()> {
        let url = resource
            .get("url")
            .and_then(Value::as_str)
            .ok_or(Error::MissingField("url"))?;
        let version = resource.get("version").and_then(Value::as_str);

        if self.catalog.touch(url, version, last_seen).await? {
            return Ok(());
        }
        self.catalog.upsert(resource, last_seen).await
    }

    /// Fetch a ValueSet by its catalog id, fetching and upserting the
    /// full resource from the remote server on first access if the
    /// cached row has no `compose` (a bare search-result summary).
    pub async fn fetch_value_set_by_id(&self, id: &str) -> Result<Option<Value>> {
        let Some(cached) = self.catalog.fetch_by_id(id).await? else {
            return Ok(None);
        };
        if cached.get("compose").is_some() {
            return Ok(Some(cached));
        }

        let Some(url) = cached.get("url").and_then(Value::as_str) else {
            return Ok(Some(cached));
        };
        let version = cached.get("version").and_then(Value::as_str);

        let query = match version {
            Some(v) => format!("url={url}&version={v}"),
            None => format!("url={url}"),
        };
        let full_url = format!("{}/ValueSet?{query}", self.base_url.trim_end_matches('/'));
        let bundle: Value = self
            .client
            .get(&full_url)
            .basic_auth("apikey", Some(&self.api_key))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(resource) = bundle
            .get("entry")
            .and_then(Value::as_array)
            .and_then(|entries| entries.first())
            .and_then(|e| e.get("resource"))
        else {
            return Ok(Some(cached));
        };

        let now = chrono::Utc::now().timestamp();
        self.catalog.upsert(resource, now).await?;
        Ok(Some(resource.clone()))
    }
}

/// Minimal interval scheduler: sleeps, calls `refresh`, repeats.
/// Intended to be spawned as a background tokio task by the caller.
pub async fn run_refresh_loop(catalog: Arc<VsacCatalog>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let cycle_start = chrono::Utc::now().timestamp();
        if let Err(e) = catalog.refresh(cycle_start).await {
            tracing::warn!(error = %e, "VSAC refresh cycle failed");
        }
    }
}
