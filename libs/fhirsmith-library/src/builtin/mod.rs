//! Built-in code system factories registered by the `internal:<name>`
//! source type (spec §4.6).

mod areacode;
mod country;
mod currency;
mod hgvs;
mod lang;
mod mimetypes;
mod table;
mod usstates;

use std::sync::Arc;

use crate::code_system_factory::CodeSystemFactory;
use crate::error::{Error, Result};

/// Resolve an `internal:<name>` source line to its factory.
pub fn by_name(name: &str) -> Result<Arc<dyn CodeSystemFactory>> {
    Ok(match name {
        "country" => country::factory(),
        "lang" => lang::factory(),
        "currency" => currency::factory(),
        "areacode" => areacode::factory(),
        "mimetypes" => mimetypes::factory(),
        "usstates" => usstates::factory(),
        "hgvs" => hgvs::factory(),
        other => return Err(Error::UnknownSourceType(format!("internal:{other}"))),
    })
}
