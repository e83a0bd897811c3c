//! Error taxonomy (spec §7): every fallible path in the dispatcher
//! converts into one of these, and [`IntoResponse`] renders it as an
//! `OperationOutcome` with the status code and issue code the table
//! prescribes.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use fhirsmith_models::OperationOutcome;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("version inconsistent: {0}")]
    VersionInconsistent(String),

    #[error("package fetch failed: {0}")]
    PackageFetchFailed(String),

    #[error("extract failed: {0}")]
    ExtractFailed(String),

    #[error("index corrupt: {0}")]
    IndexCorrupt(String),

    #[error("load failed: {0}")]
    LoadFailed(String),

    #[error(transparent)]
    TooCostly(#[from] fhirsmith_library::TooCostly),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<fhirsmith_library::Error> for Error {
    fn from(e: fhirsmith_library::Error) -> Self {
        use fhirsmith_library::Error as LibErr;
        match e {
            LibErr::SourceParse(msg) | LibErr::UnknownSourceType(msg) => {
                Error::InvalidParameter(msg)
            }
            LibErr::UnknownFhirVersion(token) => {
                Error::InvalidParameter(format!("unrecognized FHIR version '{token}'"))
            }
            LibErr::VersionInconsistent { system, in_system, given } => {
                Error::VersionInconsistent(format!(
                    "system '{system}' already carries version '{in_system}', got '{given}'"
                ))
            }
            LibErr::Package(source) => Error::PackageFetchFailed(source.to_string()),
            LibErr::PackageIndexLoad(msg) => Error::IndexCorrupt(msg),
            LibErr::Registry(source) => Error::PackageFetchFailed(source.to_string()),
            LibErr::Catalog(source) => Error::LoadFailed(source.to_string()),
            LibErr::Ucum(source) => Error::LoadFailed(source.to_string()),
            LibErr::Io(source) => Error::LoadFailed(source.to_string()),
            LibErr::DownloadFailed { url, reason } => {
                Error::PackageFetchFailed(format!("{url}: {reason}"))
            }
            LibErr::TooCostly(inner) => Error::TooCostly(inner),
        }
    }
}

impl Error {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "exception"),
            Error::InvalidParameter(_) | Error::VersionInconsistent(_) => {
                (StatusCode::BAD_REQUEST, "invalid")
            }
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not-found"),
            Error::NotSupported(_) => (StatusCode::METHOD_NOT_ALLOWED, "not-supported"),
            Error::UnsupportedMediaType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "not-supported")
            }
            Error::PackageFetchFailed(_) => (StatusCode::BAD_GATEWAY, "exception"),
            Error::ExtractFailed(_) | Error::IndexCorrupt(_) | Error::LoadFailed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "exception")
            }
            Error::TooCostly(_) => (StatusCode::UNPROCESSABLE_ENTITY, "too-costly"),
            Error::UpstreamUnavailable(_) => (StatusCode::BAD_GATEWAY, "exception"),
            Error::AuthenticationFailed(_) => (StatusCode::UNAUTHORIZED, "security"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "exception"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "unhandled dispatcher error");
        }
        let outcome = OperationOutcome::error(code, self.to_string());
        let mut response = (status, Json(outcome)).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/fhir+json; charset=utf-8"),
        );
        response
    }
}
