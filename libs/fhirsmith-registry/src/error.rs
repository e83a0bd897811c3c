use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no server returned a version of '{package_id}' matching '{criteria}'")]
    VersionUnresolved { package_id: String, criteria: String },

    #[error("package '{package_id}' version '{version}' was not found on any configured server")]
    PackageNotFound { package_id: String, version: String },

    #[error("network error fetching '{package_id}': {source}")]
    NetworkError {
        package_id: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to extract package '{package_id}#{version}': {reason}")]
    ExtractFailed {
        package_id: String,
        version: String,
        reason: String,
    },

    #[error("CI build index unavailable: {0}")]
    CiBuildUnavailable(String),

    #[error(transparent)]
    Package(#[from] fhirsmith_package::Error),

    #[error(transparent)]
    Layout(#[from] fhirsmith_layout::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
