//! FHIR OperationOutcome model
//!
//! The uniform error/diagnostic envelope returned by every failed
//! operation (see the Dispatcher error-rendering contract).

use serde::{Deserialize, Serialize};

/// FHIR OperationOutcome resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    pub issue: Vec<OperationOutcomeIssue>,
}

fn default_resource_type() -> String {
    "OperationOutcome".to_string()
}

/// A single issue within an OperationOutcome
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcomeIssue {
    /// fatal | error | warning | information
    pub severity: IssueSeverity,

    /// The FHIR issue type code (invalid, not-found, not-supported, ...)
    pub code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Fatal,
    Error,
    Warning,
    Information,
}

impl OperationOutcome {
    pub fn error(code: impl Into<String>, diagnostics: impl Into<String>) -> Self {
        Self {
            resource_type: "OperationOutcome".to_string(),
            issue: vec![OperationOutcomeIssue {
                severity: IssueSeverity::Error,
                code: code.into(),
                diagnostics: Some(diagnostics.into()),
            }],
        }
    }
}
