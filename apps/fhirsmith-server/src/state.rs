//! Dispatcher application state: the registry of configured endpoints,
//! each holding its own `Provider`, terminology engine and caches
//! (spec §4.7–§4.8).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fhirsmith_layout::Layout;
use fhirsmith_library::{BasicEngine, ExpansionCache, Library, Provider, ResourceCache, TerminologyEngine};
use fhirsmith_package::PackageIndexCache;
use fhirsmith_registry::PackageManager;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::stats::OperationStats;

pub struct Endpoint {
    pub path: String,
    pub fhir_version: String,
    pub provider: Arc<Provider>,
    pub engine: Arc<dyn TerminologyEngine>,
    pub resource_cache: Arc<ResourceCache>,
    pub expansion_cache: Arc<ExpansionCache>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub layout: Arc<Layout>,
    pub registry: Arc<PackageManager>,
    pub endpoints: Arc<HashMap<String, Arc<Endpoint>>>,
    pub stats: Arc<OperationStats>,
}

impl AppState {
    /// Build every configured endpoint's `Library`/`Provider`, prepending
    /// the FHIR-version-specific core package to each one's value-set
    /// providers (spec §4.6), and wrap them behind a path-keyed registry.
    /// Fails fast on a duplicate path — `Config::validate` already checks
    /// this, but a fresh check here keeps `AppState::new` safe to call
    /// directly from tests.
    pub async fn new(config: Config) -> Result<Self> {
        let layout = match &config.data_dir {
            Some(dir) => Layout::at(dir.clone()),
            None => Layout::resolve(),
        };
        layout
            .ensure()
            .map_err(|e| Error::Config(format!("preparing data directory: {e}")))?;

        let registry = PackageManager::new(config.servers.clone(), layout.clone());
        let package_index_cache = PackageIndexCache::new();

        let mut endpoints = HashMap::new();
        for endpoint_config in &config.endpoints {
            let yaml = match (&endpoint_config.library_yaml, &endpoint_config.library_file) {
                (Some(inline), _) => inline.clone(),
                (None, Some(path)) => std::fs::read_to_string(path)
                    .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?,
                (None, None) => {
                    return Err(Error::Config(format!(
                        "endpoint '{}' has no library source",
                        endpoint_config.path
                    )))
                }
            };

            let library = Library::from_descriptor(&yaml, &layout, &registry).await?;
            let base_provider = Provider::new(library);

            let core_catalogs = Library::core_value_set_catalogs(
                &endpoint_config.fhir_version,
                &registry,
                &layout,
                &package_index_cache,
            )
            .await?;

            let provider = Arc::new(base_provider.clone_with_fhir_version(
                core_catalogs,
                &dummy_context(&config),
                &endpoint_config.path,
            ));
            let engine: Arc<dyn TerminologyEngine> = Arc::new(BasicEngine::new(provider.clone()));

            let resource_cache = Arc::new(ResourceCache::new(Duration::from_secs(
                config.cache.resource_cache_timeout_secs,
            )));
            let expansion_cache = Arc::new(ExpansionCache::new(
                config.cache.expansion_cache_capacity,
                config.cache.expansion_cache_memory_mb,
            ));

            let path = normalize_path(&endpoint_config.path);
            if endpoints
                .insert(
                    path.clone(),
                    Arc::new(Endpoint {
                        path: path.clone(),
                        fhir_version: endpoint_config.fhir_version.clone(),
                        provider,
                        engine,
                        resource_cache,
                        expansion_cache,
                    }),
                )
                .is_some()
            {
                return Err(Error::Config(format!("duplicate endpoint path '{path}'")));
            }
            tracing::info!(path, fhir_version = %endpoint_config.fhir_version, "registered endpoint");
        }

        Ok(Self {
            config: Arc::new(config),
            layout: Arc::new(layout),
            registry: Arc::new(registry),
            endpoints: Arc::new(endpoints),
            stats: Arc::new(OperationStats::new()),
        })
    }

    pub fn endpoint(&self, path: &str) -> Option<Arc<Endpoint>> {
        self.endpoints.get(&normalize_path(path)).cloned()
    }

    /// Path a registered endpoint is mounted at, normalized the same
    /// way [`Self::endpoint`] looks keys up — used to recover the
    /// endpoint a request's nested router was built for.
    pub fn normalize_endpoint_path(path: &str) -> String {
        normalize_path(path)
    }

    /// All endpoints, in registration order by path — used by the
    /// `/$versions` aggregate handler (spec §4.8) and by router assembly.
    pub fn all_endpoints(&self) -> impl Iterator<Item = &Arc<Endpoint>> {
        self.endpoints.values()
    }

    /// Sweep every endpoint's caches on the shared 5-minute tick (spec
    /// §4.7), driven by [`crate::background::run`].
    pub fn sweep_caches(&self) {
        for endpoint in self.endpoints.values() {
            let evicted = endpoint.resource_cache.sweep();
            endpoint.expansion_cache.enforce_memory_threshold_tick();
            if evicted > 0 {
                tracing::debug!(path = %endpoint.path, evicted, "swept resource cache");
            }
        }
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// A throwaway context used only to drive `clone_with_fhir_version`,
/// which never actually calls `dead_check` itself — callers check their
/// own deadline on the context built per-request.
fn dummy_context(config: &Config) -> fhirsmith_library::OperationContext {
    fhirsmith_library::OperationContext::new(
        "startup",
        None,
        Arc::new(ResourceCache::new(Duration::from_secs(
            config.cache.resource_cache_timeout_secs,
        ))),
        Arc::new(ExpansionCache::new(config.cache.expansion_cache_capacity, None)),
    )
}
