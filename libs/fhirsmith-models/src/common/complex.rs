//! Small shared complex types used by several resources.
//!
//! Kept deliberately minimal: only the subset of FHIR's data types that
//! `ValueSet`, `CodeSystem`, and `ConceptMap` actually reference.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Publication status (draft | active | retired | unknown)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PublicationStatus {
    Draft,
    Active,
    Retired,
    Unknown,
}

/// Contact details for the publisher
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub telecom: Option<Vec<Value>>,
}

/// Describes the context of use for a resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsageContext {
    pub code: Value,
    #[serde(flatten)]
    pub value: Value,
}
