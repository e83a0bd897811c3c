use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("catalog database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("malformed resource, missing required field '{0}'")]
    MissingField(&'static str),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("VSAC request failed: {0}")]
    VsacRequest(#[from] reqwest::Error),

    #[error("VSAC returned an unexpected bundle shape: {0}")]
    VsacBundleShape(String),
}

pub type Result<T> = std::result::Result<T, Error>;
