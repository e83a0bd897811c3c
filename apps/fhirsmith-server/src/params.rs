//! Inbound parameter handling (spec §4.8 step 3): parse a POST body per
//! the accepted content types and merge it with query-string parameters
//! into one case-sensitive multimap, the way GET and POST variants of
//! the same operation feed a single handler.

use std::collections::HashMap;

use axum::http::HeaderMap;
use serde_json::Value;

use crate::error::{Error, Result};

pub type ParamMap = HashMap<String, Vec<String>>;

/// Accepts `application/fhir+json`, `application/json`,
/// `application/fhir+xml`, `application/xml`; anything else is a 415
/// (spec §6). An empty body parses to `Value::Null`.
pub fn parse_body(body: &[u8], headers: &HeaderMap) -> Result<Value> {
    if body.is_empty() {
        return Ok(Value::Null);
    }
    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/fhir+json")
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match content_type.as_str() {
        "application/fhir+json" | "application/json" | "" => serde_json::from_slice(body)
            .map_err(|e| Error::InvalidParameter(format!("invalid JSON body: {e}"))),
        "application/fhir+xml" | "application/xml" | "text/xml" => {
            let text = std::str::from_utf8(body)
                .map_err(|e| Error::InvalidParameter(format!("invalid UTF-8 body: {e}")))?;
            let json_str = fhirsmith_format::xml_to_json(text)
                .map_err(|e| Error::InvalidParameter(format!("invalid XML body: {e}")))?;
            serde_json::from_str(&json_str)
                .map_err(|e| Error::InvalidParameter(format!("invalid XML body: {e}")))
        }
        other => Err(Error::UnsupportedMediaType(other.to_string())),
    }
}

/// Fold a `Parameters` resource body's `parameter` array (if `body` is
/// one) and the query string into a single multimap. `_`-prefixed
/// search-result-control parameters are excluded, since those are
/// handled by [`crate::content_negotiation`].
pub fn merge_params(query: &HashMap<String, String>, body: &Value) -> ParamMap {
    let mut map: ParamMap = HashMap::new();

    if body.get("resourceType").and_then(Value::as_str) == Some("Parameters") {
        if let Some(params) = body.get("parameter").and_then(Value::as_array) {
            for param in params {
                let Some(name) = param.get("name").and_then(Value::as_str) else {
                    continue;
                };
                if let Some(value) = first_value(param) {
                    map.entry(name.to_string()).or_default().push(value);
                }
            }
        }
    }

    for (key, value) in query {
        if key.starts_with('_') {
            continue;
        }
        map.entry(key.clone()).or_default().push(value.clone());
    }

    map
}

fn first_value(param: &Value) -> Option<String> {
    let obj = param.as_object()?;
    obj.iter().find_map(|(key, value)| {
        if !key.starts_with("value") {
            return None;
        }
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    })
}

pub fn single(params: &ParamMap, name: &str) -> Option<String> {
    params.get(name).and_then(|v| v.first()).cloned()
}

pub fn all(params: &ParamMap, name: &str) -> Vec<String> {
    params.get(name).cloned().unwrap_or_default()
}

pub fn require(params: &ParamMap, name: &str) -> Result<String> {
    single(params, name).ok_or_else(|| Error::InvalidParameter(format!("missing parameter '{name}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merges_parameters_body_with_query() {
        let body = json!({
            "resourceType": "Parameters",
            "parameter": [
                {"name": "system", "valueUri": "http://loinc.org"},
                {"name": "code", "valueCode": "1234-5"}
            ]
        });
        let mut query = HashMap::new();
        query.insert("version".to_string(), "2.81".to_string());

        let merged = merge_params(&query, &body);
        assert_eq!(single(&merged, "system").as_deref(), Some("http://loinc.org"));
        assert_eq!(single(&merged, "code").as_deref(), Some("1234-5"));
        assert_eq!(single(&merged, "version").as_deref(), Some("2.81"));
    }

    #[test]
    fn excludes_underscore_prefixed_query_params() {
        let merged = merge_params(
            &HashMap::from([("_format".to_string(), "xml".to_string())]),
            &Value::Null,
        );
        assert!(merged.is_empty());
    }
}
