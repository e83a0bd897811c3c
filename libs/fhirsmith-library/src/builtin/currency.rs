//! ISO 4217 currency codes, the subset FHIR's `MonetaryAmount`
//! examples most commonly reference.

use std::sync::Arc;

use super::table::StaticTable;
use crate::code_system_factory::CodeSystemFactory;

const SYSTEM: &str = "urn:iso:std:iso:4217";

const DATA: &[(&str, &str)] = &[
    ("AUD", "Australian Dollar"),
    ("BRL", "Brazilian Real"),
    ("CAD", "Canadian Dollar"),
    ("CHF", "Swiss Franc"),
    ("CNY", "Yuan Renminbi"),
    ("EUR", "Euro"),
    ("GBP", "Pound Sterling"),
    ("INR", "Indian Rupee"),
    ("JPY", "Yen"),
    ("MXN", "Mexican Peso"),
    ("NZD", "New Zealand Dollar"),
    ("SEK", "Swedish Krona"),
    ("SGD", "Singapore Dollar"),
    ("USD", "US Dollar"),
    ("ZAR", "Rand"),
];

pub fn factory() -> Arc<dyn CodeSystemFactory> {
    StaticTable::new(SYSTEM, DATA)
}
