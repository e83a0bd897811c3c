//! FHIR ConceptMap model
//!
//! Version-agnostic model for ConceptMaps (terminology)

use super::complex::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// FHIR ConceptMap resource
///
/// A statement of relationships from one set of concepts to another.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConceptMap {
    /// Resource type - always "ConceptMap"
    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Canonical identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub status: PublicationStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Vec<ContactDetail>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_context: Option<Vec<UsageContext>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,

    /// Source value set (the "from" domain), when fixed for the whole map
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_scope: Option<Value>,

    /// Target value set (the "to" domain), when fixed for the whole map
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_scope: Option<Value>,

    /// Same source/target pair, with concrete element mappings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<Vec<ConceptMapGroup>>,

    /// Additional content
    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

fn default_resource_type() -> String {
    "ConceptMap".to_string()
}

/// Same source/target pair, with concrete mappings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConceptMapGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    pub element: Vec<ConceptMapGroupElement>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unmapped: Option<Value>,
}

/// Mappings for a single concept in the source system
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConceptMapGroupElement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Vec<ConceptMapGroupElementTarget>>,
}

/// A concept in the target system that the source concept maps to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConceptMapGroupElementTarget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    /// related-to | equivalent | source-is-narrower-than-target | ...
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ConceptMap {
    pub fn new(status: PublicationStatus) -> Self {
        Self {
            resource_type: "ConceptMap".to_string(),
            id: None,
            url: None,
            version: None,
            name: None,
            title: None,
            status,
            experimental: None,
            date: None,
            publisher: None,
            contact: None,
            description: None,
            use_context: None,
            jurisdiction: None,
            purpose: None,
            copyright: None,
            source_scope: None,
            target_scope: None,
            group: None,
            extensions: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_concept_map() {
        let json = json!({
            "resourceType": "ConceptMap",
            "id": "example",
            "url": "http://example.org/fhir/ConceptMap/example",
            "status": "active",
            "group": [{
                "source": "http://example.org/fhir/CodeSystem/a",
                "target": "http://example.org/fhir/CodeSystem/b",
                "element": [{
                    "code": "foo",
                    "target": [{"code": "bar", "relationship": "equivalent"}]
                }]
            }]
        });

        let cm: ConceptMap = serde_json::from_value(json).unwrap();
        assert_eq!(cm.id, Some("example".to_string()));
        assert_eq!(cm.status, PublicationStatus::Active);
        let group = &cm.group.unwrap()[0];
        assert_eq!(group.element[0].code, Some("foo".to_string()));
        assert_eq!(
            group.element[0].target.as_ref().unwrap()[0].relationship,
            Some("equivalent".to_string())
        );
    }

    #[test]
    fn test_new_minimal() {
        let cm = ConceptMap::new(PublicationStatus::Draft);
        assert_eq!(cm.resource_type, "ConceptMap");
        assert!(cm.group.is_none());
    }
}
