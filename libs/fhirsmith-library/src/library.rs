//! The `Library` (spec §4.6): resolves a YAML source descriptor into
//! code system factories/resources and ordered value-set/concept-map
//! catalogs.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use fhirsmith_catalog::{Catalog, Kind};
use fhirsmith_layout::{conceptmaps_db, valuesets_db, Layout};
use fhirsmith_models::CodeSystem;
use fhirsmith_package::PackageIndexCache;
use fhirsmith_registry::PackageManager;
use fhirsmith_versioning::maj_min;
use tracing::{info, warn};

use crate::builtin;
use crate::code_system_factory::CodeSystemFactory;
use crate::error::{Error, Result};
use crate::file_backed::FileBackedFactory;
use crate::source::{parse_descriptor, Base, SourceEntry, SourceKind};
use crate::ucum_factory::UcumFactory;

pub struct Library {
    code_system_factories: HashMap<String, Arc<dyn CodeSystemFactory>>,
    code_systems: HashMap<String, Arc<CodeSystem>>,
    value_set_providers: Vec<Arc<Catalog>>,
    concept_map_providers: Vec<Arc<Catalog>>,
}

impl Library {
    pub fn empty() -> Self {
        Self {
            code_system_factories: HashMap::new(),
            code_systems: HashMap::new(),
            value_set_providers: Vec::new(),
            concept_map_providers: Vec::new(),
        }
    }

    pub fn code_system_factories(&self) -> &HashMap<String, Arc<dyn CodeSystemFactory>> {
        &self.code_system_factories
    }

    pub fn code_systems(&self) -> &HashMap<String, Arc<CodeSystem>> {
        &self.code_systems
    }

    pub fn value_set_providers(&self) -> &[Arc<Catalog>] {
        &self.value_set_providers
    }

    pub fn concept_map_providers(&self) -> &[Arc<Catalog>] {
        &self.concept_map_providers
    }

    /// Register `factory` under `system`, `system|version`, `system|`,
    /// and — when `version` is semver — `system|major.minor` (spec §3
    /// Lookup index), so `Provider::getCodeSystemProvider` (spec §4.6
    /// step 3) can find it regardless of which form the caller queries
    /// with. A source marked `preferred` overwrites an existing
    /// registration at the bare `system` key; otherwise the first
    /// registration wins.
    pub(crate) fn register_factory(&mut self, factory: Arc<dyn CodeSystemFactory>, preferred: bool) {
        let system = factory.system().to_string();
        if preferred || !self.code_system_factories.contains_key(&system) {
            self.code_system_factories.insert(system.clone(), factory.clone());
        }
        match factory.version() {
            Some(v) => {
                self.code_system_factories
                    .entry(format!("{system}|{v}"))
                    .or_insert(factory.clone());
                if let Some(mm) = maj_min(v) {
                    self.code_system_factories
                        .entry(format!("{system}|{mm}"))
                        .or_insert(factory);
                }
            }
            None => {
                self.code_system_factories
                    .entry(format!("{system}|"))
                    .or_insert(factory);
            }
        }
    }

    fn register_code_system(&mut self, resource: CodeSystem) {
        let key = resource.url.clone();
        let arc = Arc::new(resource);
        if let Some(version) = &arc.version {
            self.code_systems
                .insert(format!("{key}|{version}"), arc.clone());
            if let Some(mm) = maj_min(version) {
                self.code_systems
                    .entry(format!("{key}|{mm}"))
                    .or_insert(arc.clone());
            }
        }
        self.code_systems.entry(key).or_insert(arc);
    }

    /// Build a Library from a parsed YAML descriptor (spec §4.6), given
    /// the layout to cache downloads/extractions under and the package
    /// manager to fetch `npm:` sources through.
    pub async fn from_descriptor(
        yaml: &str,
        layout: &Layout,
        registry: &PackageManager,
    ) -> Result<Self> {
        let (base, sources) = parse_descriptor(yaml)?;
        let mut library = Self::empty();
        let package_index_cache = PackageIndexCache::new();
        for entry in sources {
            library
                .register_source(entry, &base, layout, registry, &package_index_cache)
                .await?;
        }
        Ok(library)
    }

    async fn register_source(
        &mut self,
        entry: SourceEntry,
        base: &Base,
        layout: &Layout,
        registry: &PackageManager,
        package_index_cache: &PackageIndexCache,
    ) -> Result<()> {
        match entry.kind {
            SourceKind::Internal(name) => {
                let factory = builtin::by_name(&name)?;
                self.register_factory(factory, entry.preferred);
            }
            SourceKind::Ucum(path) => {
                let path = if path.is_empty() { None } else { Some(path.as_str()) };
                let factory = UcumFactory::register(path)?;
                self.register_factory(factory, entry.preferred);
            }
            SourceKind::Tabular { engine, file } => {
                let factory =
                    FileBackedFactory::register(engine, &file, base.url.as_deref(), &layout.cache())
                        .await?;
                self.register_factory(factory, entry.preferred);
            }
            SourceKind::Npm { package_id, version } => {
                self.register_npm_source(&package_id, version.as_deref(), layout, registry, package_index_cache, entry.preferred)
                    .await?;
            }
        }
        Ok(())
    }

    async fn register_npm_source(
        &mut self,
        package_id: &str,
        version: Option<&str>,
        layout: &Layout,
        registry: &PackageManager,
        package_index_cache: &PackageIndexCache,
        preferred: bool,
    ) -> Result<()> {
        let dir_name = registry.fetch(package_id, version).await?;
        let package_dir = layout.cache().join(&dir_name);
        let index = package_index_cache
            .open(&package_dir)
            .map_err(|e| Error::PackageIndexLoad(e.to_string()))?;

        for indexed in index.resources_of_type("CodeSystem") {
            match index
                .load_file(indexed)
                .map_err(Error::from)
                .and_then(|v| serde_json::from_value::<CodeSystem>(v).map_err(|e| Error::PackageIndexLoad(e.to_string())))
            {
                Ok(resource) => self.register_code_system(resource),
                Err(e) => warn!(package = package_id, error = %e, "skipping unreadable CodeSystem"),
            }
        }

        let cycle_start = Utc::now().timestamp();
        self.ingest_catalog(Kind::ValueSet, &package_dir, &index, cycle_start, preferred)
            .await?;
        self.ingest_catalog(Kind::ConceptMap, &package_dir, &index, cycle_start, preferred)
            .await?;

        info!(package = package_id, "registered npm source");
        Ok(())
    }

    /// `preferred` sources are inserted at the front of the provider
    /// list rather than appended, so they are searched before any
    /// earlier-registered catalog (spec §4.6's ordered provider list).
    async fn ingest_catalog(
        &mut self,
        kind: Kind,
        package_dir: &std::path::Path,
        index: &fhirsmith_package::PackageIndex,
        last_seen: i64,
        preferred: bool,
    ) -> Result<()> {
        let db_path = match kind {
            Kind::ValueSet => valuesets_db(package_dir),
            Kind::ConceptMap => conceptmaps_db(package_dir),
        };
        let catalog = Arc::new(Catalog::open(&db_path, kind).await?);
        for indexed in index.resources_of_type(kind.resource_type()) {
            let resource = index.load_file(indexed)?;
            catalog.upsert(&resource, last_seen).await?;
        }
        let providers = match kind {
            Kind::ValueSet => &mut self.value_set_providers,
            Kind::ConceptMap => &mut self.concept_map_providers,
        };
        if preferred {
            providers.insert(0, catalog);
        } else {
            providers.push(catalog);
        }
        Ok(())
    }

    /// Prepend `extra` to the value-set provider list in place: used by
    /// `Provider::clone_with_fhir_version` to search version-appropriate
    /// FHIR core packages first (spec §4.6).
    pub(crate) fn prepend_value_set_providers(&mut self, extra: Vec<Arc<Catalog>>) {
        let mut combined = extra;
        combined.append(&mut self.value_set_providers);
        self.value_set_providers = combined;
    }

    /// Register a concept-map catalog directly, bypassing the npm
    /// package ingestion path. Used by tests exercising `$translate`
    /// against a catalog built from an in-memory resource.
    #[cfg(test)]
    pub(crate) fn add_concept_map_provider(&mut self, catalog: Arc<Catalog>) {
        self.concept_map_providers.push(catalog);
    }

    /// Fetch (downloading if absent) the FHIR core package for `fhir_version_token`
    /// (an `R4`/`R4B`/`R5`/... token or a bare semver) and index its ValueSets into
    /// a fresh catalog. Used by a Dispatcher endpoint to build the
    /// version-appropriate provider list it prepends via
    /// [`Provider::clone_with_fhir_version`](crate::provider::Provider::clone_with_fhir_version)
    /// (spec §4.6).
    pub async fn core_value_set_catalogs(
        fhir_version_token: &str,
        registry: &PackageManager,
        layout: &Layout,
        package_index_cache: &PackageIndexCache,
    ) -> Result<Vec<Arc<Catalog>>> {
        let normalized = fhirsmith_versioning::normalize_special(fhir_version_token);
        let family = fhirsmith_versioning::family_for(&normalized)
            .ok_or_else(|| Error::UnknownFhirVersion(fhir_version_token.to_string()))?;
        let package_id = fhirsmith_versioning::package_for_version(family);

        let dir_name = registry.fetch(package_id, None).await?;
        let package_dir = layout.cache().join(&dir_name);
        let index = package_index_cache
            .open(&package_dir)
            .map_err(|e| Error::PackageIndexLoad(e.to_string()))?;

        let db_path = valuesets_db(&package_dir);
        let catalog = Arc::new(Catalog::open(&db_path, Kind::ValueSet).await?);
        let cycle_start = Utc::now().timestamp();
        for indexed in index.resources_of_type(Kind::ValueSet.resource_type()) {
            let resource = index.load_file(indexed)?;
            catalog.upsert(&resource, cycle_start).await?;
        }
        Ok(vec![catalog])
    }

    pub(crate) fn shallow_clone(&self) -> Self {
        Self {
            code_system_factories: self.code_system_factories.clone(),
            code_systems: self.code_systems.clone(),
            value_set_providers: self.value_set_providers.clone(),
            concept_map_providers: self.concept_map_providers.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhirsmith_registry::PackageManager;

    fn empty_registry() -> PackageManager {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::at(tmp.path());
        layout.ensure().unwrap();
        PackageManager::new(Vec::new(), layout)
    }

    #[tokio::test]
    async fn loads_internal_and_ucum_sources() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::at(tmp.path());
        layout.ensure().unwrap();
        let registry = empty_registry();

        let yaml = "sources:\n  - internal:country\n  - internal!:lang\n  - ucum:\n";
        let library = Library::from_descriptor(yaml, &layout, &registry).await.unwrap();

        assert!(library
            .code_system_factories()
            .contains_key("urn:iso:std:iso:3166"));
        assert!(library
            .code_system_factories()
            .contains_key("urn:ietf:bcp:47"));
        assert!(library
            .code_system_factories()
            .contains_key(fhirsmith_ucum::SYSTEM));
    }

    #[tokio::test]
    async fn rejects_unknown_internal_name() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::at(tmp.path());
        layout.ensure().unwrap();
        let registry = empty_registry();

        let yaml = "sources:\n  - internal:bogus\n";
        let err = Library::from_descriptor(yaml, &layout, &registry).await.unwrap_err();
        assert!(matches!(err, Error::UnknownSourceType(_)));
    }
}
