//! Resolves the on-disk root directory the server reads and writes
//! under, and the named subdirectories within it.
//!
//! Replaces a process-wide singleton with an explicit value: `Layout`
//! is constructed once in `main` and passed into every component that
//! needs a path, rather than resolved ad-hoc from each call site.

use std::path::{Path, PathBuf};

mod error;
pub use error::{Error, Result};

/// The environment variable that overrides the default data root.
pub const DATA_DIR_ENV: &str = "FHIRSMITH_DATA_DIR";

/// On-disk root and its named subdirectories.
///
/// `cache` holds extracted packages (`{packageId}#{version}` dirs and
/// their sibling `.valuesets.db`/`.conceptmaps.db` files), `logs` holds
/// rotated log files when file logging is enabled, `databases` holds
/// catalogs that are not package-scoped (e.g. the VSAC catalog).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    /// Resolve the root from `FHIRSMITH_DATA_DIR` if set, else the OS
    /// data directory joined with `fhirsmith`, else `./data` as a last
    /// resort when the platform exposes no data directory at all.
    pub fn resolve() -> Self {
        let root = std::env::var_os(DATA_DIR_ENV)
            .map(PathBuf::from)
            .or_else(|| dirs::data_dir().map(|d| d.join("fhirsmith")))
            .unwrap_or_else(|| PathBuf::from("./data"));
        Self::at(root)
    }

    /// Build a layout rooted at an explicit path, bypassing environment
    /// and OS discovery. Primarily useful for tests.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root and every named subdirectory if missing.
    pub fn ensure(&self) -> Result<()> {
        for dir in [self.root(), self.cache(), self.logs(), self.databases()] {
            std::fs::create_dir_all(&dir).map_err(|source| Error::CreateDir {
                path: dir,
                source,
            })?;
        }
        Ok(())
    }

    pub fn root(&self) -> PathBuf {
        self.root.clone()
    }

    /// Directory holding extracted package caches.
    pub fn cache(&self) -> PathBuf {
        self.root.join("cache")
    }

    /// Directory holding log files.
    pub fn logs(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Directory holding catalogs that are not scoped to a single
    /// extracted package (the VSAC catalog).
    pub fn databases(&self) -> PathBuf {
        self.root.join("databases")
    }

    /// The cache directory name for an installed package: `id#version`.
    pub fn package_dir_name(package_id: &str, version: &str) -> String {
        format!("{package_id}#{version}")
    }

    /// Full path to an installed package's extraction directory.
    pub fn package_path(&self, package_id: &str, version: &str) -> PathBuf {
        self.cache().join(Self::package_dir_name(package_id, version))
    }

    /// Whether a package is already present in the cache.
    pub fn has_package(&self, package_id: &str, version: &str) -> bool {
        self.package_path(package_id, version).is_dir()
    }

    /// A working directory for an in-progress extraction, kept distinct
    /// from the final name so a crash mid-extract never leaves a
    /// directory that looks complete.
    pub fn package_staging_path(&self, package_id: &str, version: &str) -> PathBuf {
        self.cache()
            .join(format!(".{}.staging", Self::package_dir_name(package_id, version)))
    }

    pub fn vsac_database(&self) -> PathBuf {
        self.databases().join("vsac.db")
    }
}

/// Side-database paths colocated with an extracted package directory.
pub fn valuesets_db(package_dir: &Path) -> PathBuf {
    package_dir.join(".valuesets.db")
}

pub fn conceptmaps_db(package_dir: &Path) -> PathBuf {
    package_dir.join(".conceptmaps.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_dir_name_uses_hash_separator() {
        assert_eq!(
            Layout::package_dir_name("hl7.fhir.r4.core", "4.0.1"),
            "hl7.fhir.r4.core#4.0.1"
        );
    }

    #[test]
    fn ensure_creates_all_subdirectories() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::at(tmp.path().join("root"));
        layout.ensure().unwrap();
        assert!(layout.cache().is_dir());
        assert!(layout.logs().is_dir());
        assert!(layout.databases().is_dir());
    }

    #[test]
    fn resolve_honours_env_override() {
        let tmp = tempfile::tempdir().unwrap();
        std::env::set_var(DATA_DIR_ENV, tmp.path());
        let layout = Layout::resolve();
        std::env::remove_var(DATA_DIR_ENV);
        assert_eq!(layout.root(), tmp.path());
    }

    #[test]
    fn package_path_matches_cache_dir_name_contract() {
        let layout = Layout::at("/data");
        assert_eq!(
            layout.package_path("p", "1.0.0"),
            PathBuf::from("/data/cache/p#1.0.0")
        );
    }
}
