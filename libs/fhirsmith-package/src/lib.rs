//! FHIR NPM package handling: manifest model, on-disk index, and
//! archive extraction.
//!
//! This crate deliberately knows nothing about HTTP or the cache
//! directory layout — see `fhirsmith-registry` and `fhirsmith-layout`
//! for those. It only understands the shape of an extracted package
//! directory: `package/package.json`, `package/.index.json`, and the
//! resource files the index points at.

mod error;
mod extract;
mod index;
mod manifest;
mod raw_index;

pub use error::{Error, Result};
pub use extract::{clean_stale_staging, extract_tar_gz};
pub use index::{PackageIndex, PackageIndexCache};
pub use manifest::{Maintainer, PackageManifest, PackageName, PackageType, PackageVersion, Url, VersionReference};
pub use raw_index::{IndexedFile, RawIndex};
