//! North American Numbering Plan area codes. No HL7-published
//! canonical URI exists for this system; the URI below is this
//! project's own, in the same style FHIR uses for other
//! locally-defined code systems.

use std::sync::Arc;

use super::table::StaticTable;
use crate::code_system_factory::CodeSystemFactory;

const SYSTEM: &str = "http://fhirsmith.dev/CodeSystem/nanp-area-code";

const DATA: &[(&str, &str)] = &[
    ("201", "New Jersey (Hudson/Bergen)"),
    ("212", "New York (Manhattan)"),
    ("213", "California (Los Angeles)"),
    ("312", "Illinois (Chicago)"),
    ("404", "Georgia (Atlanta)"),
    ("415", "California (San Francisco)"),
    ("512", "Texas (Austin)"),
    ("617", "Massachusetts (Boston)"),
    ("702", "Nevada (Las Vegas)"),
    ("713", "Texas (Houston)"),
    ("202", "District of Columbia"),
    ("305", "Florida (Miami)"),
    ("416", "Ontario (Toronto)"),
    ("604", "British Columbia (Vancouver)"),
];

pub fn factory() -> Arc<dyn CodeSystemFactory> {
    StaticTable::new(SYSTEM, DATA)
}
