//! Search-result shaping shared by every resource type's search handler
//! (spec §6): `_sort`, `_offset`, `_count`, `_elements` applied over an
//! already-matched list of resources, then wrapped in a searchset
//! Bundle. `ResourceCatalog::search` already applies the `_elements`
//! optimization at the SQL layer for catalog-backed resources; this
//! re-applies it uniformly so in-memory (CodeSystem) search results get
//! the same projection.

use std::collections::HashMap;

use fhirsmith_models::{Bundle, BundleEntry, BundleType};
use serde_json::{json, Map, Value};

use crate::content_negotiation::ContentNegotiation;

pub fn searchset(mut resources: Vec<Value>, negotiation: &ContentNegotiation) -> Value {
    if let Some(sort) = &negotiation.sort {
        let (field, descending) = match sort.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (sort.as_str(), false),
        };
        resources.sort_by(|a, b| {
            let a_value = a.get(field).and_then(Value::as_str).unwrap_or("");
            let b_value = b.get(field).and_then(Value::as_str).unwrap_or("");
            if descending {
                b_value.cmp(a_value)
            } else {
                a_value.cmp(b_value)
            }
        });
    }

    let total = resources.len();
    let offset = negotiation.offset.min(total);
    let count = negotiation.count.unwrap_or(total.saturating_sub(offset));
    let page: Vec<Value> = resources.into_iter().skip(offset).take(count).collect();

    let projected: Vec<Value> = match &negotiation.elements {
        Some(fields) => page.iter().map(|r| project(r, fields)).collect(),
        None => page,
    };

    let mut bundle = Bundle::new(BundleType::Searchset);
    bundle.total = Some(total as u32);
    for resource in projected {
        bundle.add_entry(BundleEntry {
            full_url: resource.get("url").and_then(Value::as_str).map(str::to_string),
            request: None,
            response: None,
            resource: Some(resource),
            search: None,
            extensions: HashMap::new(),
        });
    }
    bundle
        .to_value()
        .unwrap_or_else(|_| json!({"resourceType": "Bundle", "type": "searchset"}))
}

fn project(resource: &Value, fields: &[String]) -> Value {
    let mut out = Map::new();
    if let Some(resource_type) = resource.get("resourceType") {
        out.insert("resourceType".to_string(), resource_type.clone());
    }
    if let Some(id) = resource.get("id") {
        out.insert("id".to_string(), id.clone());
    }
    for field in fields {
        if let Some(value) = resource.get(field) {
            if !value.is_null() {
                out.insert(field.clone(), value.clone());
            }
        }
    }
    Value::Object(out)
}

/// Substring-matches every query param (except the handful of indexed
/// columns each catalog already understands) against a resource's
/// serialized JSON — the same fallback `ResourceCatalog::search` uses
/// for unindexed params, applied here to the in-memory CodeSystem map
/// which has no SQL layer of its own.
pub fn matches_params(resource: &Value, params: &[(String, String)]) -> bool {
    params.iter().all(|(name, value)| match name.as_str() {
        "url" => resource.get("url").and_then(Value::as_str) == Some(value.as_str()),
        "version" | "name" | "title" | "status" | "publisher" | "description" | "date" => resource
            .get(name)
            .and_then(Value::as_str)
            .is_some_and(|field| field.to_lowercase().contains(&value.to_lowercase())),
        _ => serde_json::to_string(resource)
            .map(|s| s.to_lowercase().contains(&value.to_lowercase()))
            .unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_offset_and_count() {
        let resources = vec![json!({"id": "a"}), json!({"id": "b"}), json!({"id": "c"})];
        let negotiation = ContentNegotiation {
            offset: 1,
            count: Some(1),
            ..Default::default()
        };
        let bundle = searchset(resources, &negotiation);
        assert_eq!(bundle["total"], 3);
        assert_eq!(bundle["entry"][0]["resource"]["id"], "b");
        assert_eq!(bundle["entry"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn projects_requested_elements_only() {
        let resources = vec![json!({
            "resourceType": "ValueSet",
            "id": "x",
            "url": "http://x",
            "status": "active",
            "description": "demo"
        })];
        let negotiation = ContentNegotiation {
            elements: Some(vec!["status".to_string()]),
            ..Default::default()
        };
        let bundle = searchset(resources, &negotiation);
        let projected = &bundle["entry"][0]["resource"];
        assert_eq!(projected["status"], "active");
        assert!(projected.get("description").is_none());
    }
}
