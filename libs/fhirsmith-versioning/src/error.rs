use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("'{0}' is not a valid version")]
    NotSemver(String),

    #[error("'{0}' contains a wildcard but wildcards are not allowed here")]
    UnexpectedWildcard(String),

    #[error("'{0}' has a numeric part with a leading zero")]
    LeadingZero(String),
}

pub type Result<T> = std::result::Result<T, Error>;
