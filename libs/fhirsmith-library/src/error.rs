use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("source descriptor parse error: {0}")]
    SourceParse(String),

    #[error("unknown source type '{0}'")]
    UnknownSourceType(String),

    #[error("unrecognized FHIR version token '{0}'")]
    UnknownFhirVersion(String),

    #[error("version inconsistent: system '{system}' already carries version '{in_system}', got '{given}'")]
    VersionInconsistent {
        system: String,
        in_system: String,
        given: String,
    },

    #[error(transparent)]
    Package(#[from] fhirsmith_package::Error),

    /// `PackageIndexCache::open` hands back a shared `Arc<Error>` so
    /// concurrent callers can observe one failed load without cloning
    /// the underlying error; this variant carries its message since
    /// `fhirsmith_package::Error` itself is not `Clone`.
    #[error("package index load failed: {0}")]
    PackageIndexLoad(String),

    #[error(transparent)]
    Registry(#[from] fhirsmith_registry::Error),

    #[error(transparent)]
    Catalog(#[from] fhirsmith_catalog::Error),

    #[error(transparent)]
    Ucum(#[from] fhirsmith_ucum::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("download failed for {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error(transparent)]
    TooCostly(#[from] crate::operation_context::TooCostly),
}
