#![forbid(unsafe_code)]
//! UCUM (Unified Code for Units of Measure) parsing, validity checking,
//! and conversion.
//!
//! A [`Library`](../fhirsmith_library/index.html) registers one instance
//! of this crate's database per `ucum:<path>` source line; the library's
//! code-system factory wraps [`validate`]/[`convert_decimal`]/etc to
//! answer `$validate-code`/`$lookup` for the `http://unitsofmeasure.org`
//! system. Loading a custom essence XML (rather than the embedded
//! default) is done via [`UcumDb::from_essence_xml`] plus
//! [`with_db`](fn@with_db), so a `ucum:<path>` source line can point at
//! a site-local essence file without recompiling.

mod ast;
mod db;
mod error;
mod parser;
mod quantity;
mod unit;

#[cfg(feature = "ucum-fhir")]
pub mod fhir;

use once_cell::sync::{Lazy, OnceCell};

pub use ast::{Atom, Term, UnitExpr};
pub use db::UcumDb;
pub use error::{Error, Result};
pub use parser::{parse, validate};
pub use quantity::{normalize, NormalizedQuantity, Quantity};
pub use unit::{
    compare_decimal_quantities, convert_decimal, convertible, equivalent, DimensionVector, Unit,
    UnitKind,
};

static DEFAULT_DB: Lazy<db::UcumDb> = Lazy::new(|| {
    db::UcumDb::from_essence_xml(include_str!("../assets/ucum-essence.xml"))
        .expect("failed to load embedded ucum-essence.xml")
});

static OVERRIDE_DB: OnceCell<db::UcumDb> = OnceCell::new();

pub(crate) fn db() -> &'static db::UcumDb {
    OVERRIDE_DB.get().unwrap_or(&DEFAULT_DB)
}

/// Replace the process-wide unit database with one loaded from a
/// site-local essence XML file (the `ucum:<path>` source line). Must be
/// called before any other function in this crate touches the database
/// for the first time; a second call is a no-op and returns `false`.
pub fn with_db(essence_xml: &str) -> Result<bool> {
    let parsed = db::UcumDb::from_essence_xml(essence_xml)?;
    Ok(OVERRIDE_DB.set(parsed).is_ok())
}

/// Whether `code` is a known, syntactically valid UCUM unit expression.
pub fn is_valid(code: &str) -> bool {
    validate(code).is_ok()
}

/// Canonical system URI for UCUM, per the FHIR terminology contract.
pub const SYSTEM: &str = "http://unitsofmeasure.org";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_valid_reports_unknown_units() {
        assert!(is_valid("mg"));
        assert!(!is_valid("bogus-unit-code"));
    }
}
