//! BCP 47 language tags, per the common subset FHIR's own
//! `languages` value set draws from.

use std::sync::Arc;

use super::table::StaticTable;
use crate::code_system_factory::CodeSystemFactory;

const SYSTEM: &str = "urn:ietf:bcp:47";

const DATA: &[(&str, &str)] = &[
    ("ar", "Arabic"),
    ("de", "German"),
    ("de-DE", "German (Germany)"),
    ("en", "English"),
    ("en-GB", "English (Great Britain)"),
    ("en-US", "English (United States)"),
    ("es", "Spanish"),
    ("es-ES", "Spanish (Spain)"),
    ("fr", "French"),
    ("fr-CA", "French (Canada)"),
    ("hi", "Hindi"),
    ("it", "Italian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("nl", "Dutch"),
    ("pt", "Portuguese"),
    ("pt-BR", "Portuguese (Brazil)"),
    ("ru", "Russian"),
    ("sv", "Swedish"),
    ("zh", "Chinese"),
    ("zh-CN", "Chinese (China)"),
];

pub fn factory() -> Arc<dyn CodeSystemFactory> {
    StaticTable::new(SYSTEM, DATA)
}
