//! Reads an extracted package directory and builds the lookup maps a
//! [`PackageIndex`] exposes: `{resourceType}/{id}` and canonical-url
//! lookups, with lazy file loading.

use crate::error::{Error, Result};
use crate::manifest::PackageManifest;
use crate::raw_index::{IndexedFile, RawIndex};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

/// Read `package/package.json` and `package/.index.json` under an
/// extracted package directory and build the two lookup maps the spec
/// names: `typeAndId → entry` and `canonical → entry`.
#[derive(Debug)]
pub struct PackageIndex {
    dir: PathBuf,
    manifest: PackageManifest,
    by_type_id: HashMap<String, IndexedFile>,
    by_canonical: HashMap<String, IndexedFile>,
}

impl PackageIndex {
    /// Build the index for an already-extracted package directory.
    /// This does the actual I/O; prefer [`PackageIndexCache::open`] for
    /// concurrency-safe, idempotent access.
    pub fn load(dir: &Path) -> Result<Self> {
        let manifest_path = dir.join("package/package.json");
        let manifest_bytes = fs::read(&manifest_path).map_err(|e| Error::MissingFile(format!(
            "{}: {}",
            manifest_path.display(),
            e
        )))?;
        let manifest: PackageManifest = serde_json::from_slice(&manifest_bytes)?;

        let index_path = dir.join("package/.index.json");
        let index_bytes = fs::read(&index_path).map_err(|e| Error::IndexCorrupt {
            path: index_path.clone(),
            reason: e.to_string(),
        })?;
        let raw: RawIndex = serde_json::from_slice(&index_bytes).map_err(|e| Error::IndexCorrupt {
            path: index_path.clone(),
            reason: e.to_string(),
        })?;

        let mut by_type_id = HashMap::with_capacity(raw.files.len());
        let mut by_canonical = HashMap::with_capacity(raw.files.len() * 2);

        for entry in raw.files {
            if let Some(id) = &entry.id {
                by_type_id.insert(format!("{}/{}", entry.resource_type, id), entry.clone());
            }
            if let Some(url) = &entry.url {
                by_canonical.entry(url.clone()).or_insert_with(|| entry.clone());
                if let Some(version) = &entry.version {
                    by_canonical.insert(format!("{url}|{version}"), entry.clone());
                }
            }
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
            by_type_id,
            by_canonical,
        })
    }

    pub fn manifest(&self) -> &PackageManifest {
        &self.manifest
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn version(&self) -> &str {
        &self.manifest.version
    }

    pub fn fhir_version(&self) -> Option<&str> {
        self.manifest.primary_fhir_version()
    }

    pub fn resource_by_id(&self, resource_type: &str, id: &str) -> Option<&IndexedFile> {
        self.by_type_id.get(&format!("{resource_type}/{id}"))
    }

    /// Versioned key first, falling back to the unversioned entry.
    pub fn resource_by_canonical(&self, url: &str, version: Option<&str>) -> Option<&IndexedFile> {
        if let Some(version) = version {
            if let Some(entry) = self.by_canonical.get(&format!("{url}|{version}")) {
                return Some(entry);
            }
        }
        self.by_canonical.get(url)
    }

    pub fn resources_of_type(&self, resource_type: &str) -> Vec<&IndexedFile> {
        self.by_type_id
            .values()
            .filter(|e| e.resource_type == resource_type)
            .collect()
    }

    /// Read and parse `package/{entry.filename}`. Never cached: callers
    /// that need repeated access should cache the parsed value
    /// themselves (see `ResourceCatalog`, which ingests once).
    pub fn load_file(&self, entry: &IndexedFile) -> Result<Value> {
        if entry.filename.is_empty() {
            return Err(Error::IndexCorrupt {
                path: self.dir.join("package/.index.json"),
                reason: format!("entry for {} has no filename", entry.resource_type),
            });
        }
        let path = self.dir.join("package").join(&entry.filename);
        let bytes = fs::read(&path).map_err(|e| Error::LoadFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        serde_json::from_slice(&bytes).map_err(|e| Error::LoadFailed {
            path,
            reason: e.to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

type CellResult = std::result::Result<Arc<PackageIndex>, Arc<Error>>;

/// Caches `PackageIndex::load` results per directory so concurrent
/// callers for the same package share one load: the first caller
/// performs the I/O, later callers block on the same [`OnceLock`] and
/// observe the same result.
#[derive(Debug, Default)]
pub struct PackageIndexCache {
    cells: Mutex<HashMap<PathBuf, Arc<OnceLock<CellResult>>>>,
}

impl PackageIndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, dir: &Path) -> CellResult {
        let cell = {
            let mut cells = self.cells.lock().unwrap();
            cells
                .entry(dir.to_path_buf())
                .or_insert_with(|| Arc::new(OnceLock::new()))
                .clone()
        };
        cell.get_or_init(|| PackageIndex::load(dir).map(Arc::new).map_err(Arc::new))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_test_package(dir: &Path) {
        fs::create_dir_all(dir.join("package")).unwrap();
        fs::write(
            dir.join("package/package.json"),
            r#"{"name":"test.pkg","version":"1.0.0","author":"test","fhirVersions":["4.0.1"]}"#,
        )
        .unwrap();
        fs::write(
            dir.join("package/.index.json"),
            r#"{"index-version":1,"files":[
                {"filename":"ValueSet-vs1.json","resourceType":"ValueSet","id":"vs1","url":"http://x/vs1","version":"0.8.0"}
            ]}"#,
        )
        .unwrap();
        fs::write(
            dir.join("package/ValueSet-vs1.json"),
            r#"{"resourceType":"ValueSet","id":"vs1","url":"http://x/vs1","version":"0.8.0","status":"active"}"#,
        )
        .unwrap();
    }

    #[test]
    fn canonical_lookup_falls_back_to_unversioned() {
        let tmp = tempfile::tempdir().unwrap();
        write_test_package(tmp.path());
        let index = PackageIndex::load(tmp.path()).unwrap();

        assert!(index.resource_by_canonical("http://x/vs1", Some("0.8.0")).is_some());
        assert!(index.resource_by_canonical("http://x/vs1", None).is_some());
        // A non-matching requested version still falls back to the unversioned entry.
        assert!(index.resource_by_canonical("http://x/vs1", Some("0.9.0")).is_some());
        assert!(index.resource_by_canonical("http://x/missing", None).is_none());
    }

    #[test]
    fn resource_by_id_and_type() {
        let tmp = tempfile::tempdir().unwrap();
        write_test_package(tmp.path());
        let index = PackageIndex::load(tmp.path()).unwrap();

        assert!(index.resource_by_id("ValueSet", "vs1").is_some());
        assert_eq!(index.resources_of_type("ValueSet").len(), 1);
        assert_eq!(index.resources_of_type("CodeSystem").len(), 0);
    }

    #[test]
    fn load_file_parses_json() {
        let tmp = tempfile::tempdir().unwrap();
        write_test_package(tmp.path());
        let index = PackageIndex::load(tmp.path()).unwrap();
        let entry = index.resource_by_id("ValueSet", "vs1").unwrap();
        let json = index.load_file(entry).unwrap();
        assert_eq!(json["url"], "http://x/vs1");
    }

    #[test]
    fn cache_returns_the_same_index_instance() {
        let tmp = tempfile::tempdir().unwrap();
        write_test_package(tmp.path());
        let cache = PackageIndexCache::new();
        let a = cache.open(tmp.path()).unwrap();
        let b = cache.open(tmp.path()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
