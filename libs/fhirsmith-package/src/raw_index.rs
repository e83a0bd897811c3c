//! On-disk `.index.json` format.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawIndex {
    #[serde(rename = "index-version")]
    pub index_version: u8,
    pub files: Vec<IndexedFile>,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// One entry of `.index.json`: `{filename, resourceType, id, url?, version?}`
/// at minimum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedFile {
    pub filename: String,
    #[serde(rename = "resourceType")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplements: Option<String>,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn index_round_trips() {
        let index_json = json!({
            "index-version": 1,
            "files": [{
                "filename": "ValueSet-example.json",
                "resourceType": "ValueSet",
                "id": "example",
                "url": "http://example.org/fhir/ValueSet/example",
                "version": "1.0.0"
            }]
        });
        let index: RawIndex = serde_json::from_value(index_json.clone()).unwrap();
        assert_eq!(index.index_version, 1);
        assert_eq!(index.files[0].resource_type, "ValueSet");
        assert_eq!(serde_json::to_value(&index).unwrap(), index_json);
    }
}
