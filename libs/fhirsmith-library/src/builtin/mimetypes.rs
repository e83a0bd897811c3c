//! IETF BCP 13 media types, the subset FHIR's `Attachment.contentType`
//! and `Binary.contentType` most commonly carry.

use std::sync::Arc;

use super::table::StaticTable;
use crate::code_system_factory::CodeSystemFactory;

const SYSTEM: &str = "urn:ietf:bcp:13";

const DATA: &[(&str, &str)] = &[
    ("application/fhir+json", "FHIR resource, JSON encoding"),
    ("application/fhir+xml", "FHIR resource, XML encoding"),
    ("application/json", "JSON"),
    ("application/pdf", "Portable Document Format"),
    ("application/xml", "XML"),
    ("image/gif", "GIF image"),
    ("image/jpeg", "JPEG image"),
    ("image/png", "PNG image"),
    ("image/tiff", "TIFF image"),
    ("text/csv", "Comma-separated values"),
    ("text/html", "HTML"),
    ("text/plain", "Plain text"),
];

pub fn factory() -> Arc<dyn CodeSystemFactory> {
    StaticTable::new(SYSTEM, DATA)
}
