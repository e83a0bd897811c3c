//! ISO 3166-2:US state and territory subdivision codes, the subset
//! FHIR `Address.state` examples draw from.

use std::sync::Arc;

use super::table::StaticTable;
use crate::code_system_factory::CodeSystemFactory;

const SYSTEM: &str = "urn:iso:std:iso:3166:-2:US";

const DATA: &[(&str, &str)] = &[
    ("CA", "California"),
    ("CO", "Colorado"),
    ("DC", "District of Columbia"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("IL", "Illinois"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("NY", "New York"),
    ("OH", "Ohio"),
    ("PA", "Pennsylvania"),
    ("TX", "Texas"),
    ("WA", "Washington"),
];

pub fn factory() -> Arc<dyn CodeSystemFactory> {
    StaticTable::new(SYSTEM, DATA)
}
