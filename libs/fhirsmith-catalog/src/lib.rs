//! SQLite-backed metadata catalogs over ValueSet and ConceptMap
//! resources: one variant indexes a single extracted package, the
//! other is populated by periodic authenticated fetches from VSAC.

mod catalog;
mod error;
mod kind;
mod schema;
mod vsac;

pub use catalog::Catalog;
pub use error::{Error, Result};
pub use kind::Kind;
pub use vsac::{run_refresh_loop, VsacCatalog};
