//! Fetches FHIR packages from an ordered list of package servers,
//! resolving wildcard version criteria and falling back to the HL7
//! continuous-build index for `current`/`current$branch` requests.

mod ci_build;
mod error;
mod fetcher;
mod package_manager;

pub use ci_build::{synthetic_branch_version, CiBuildClient};
pub use error::{Error, Result};
pub use fetcher::Fetcher;
pub use package_manager::PackageManager;
