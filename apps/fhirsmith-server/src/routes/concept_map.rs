//! `/ConceptMap` routes (spec §4.8): search, read, `$translate`,
//! `$closure`.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Extension, Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde_json::{json, Value};

use fhirsmith_library::TranslateParameters;

use crate::error::{Error, Result};
use crate::middleware::RequestId;
use crate::params::{self, single};
use crate::routes::{build_ctx, render, EndpointPath, RequestCtx};
use crate::search;
use crate::state::AppState;

pub async fn search(
    State(state): State<AppState>,
    Extension(EndpointPath(path)): Extension<EndpointPath>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response> {
    let ctx = build_ctx(&state, &path, &headers, &query, &request_id)?;
    let body_json = params::parse_body(&body, &headers)?;
    let params_map = params::merge_params(&query, &body_json);
    let flat: Vec<(String, String)> = params_map
        .iter()
        .flat_map(|(k, vs)| vs.iter().map(move |v| (k.clone(), v.clone())))
        .collect();

    let mut seen = std::collections::HashSet::new();
    let mut resources = Vec::new();
    for catalog in ctx.endpoint.provider.library().concept_map_providers() {
        let hits = catalog
            .search(&flat, None)
            .await
            .map_err(|e| Error::Internal(anyhow::anyhow!(e)))?;
        for resource in hits {
            let key = (
                resource.get("url").and_then(Value::as_str).unwrap_or("").to_string(),
                resource.get("version").and_then(Value::as_str).unwrap_or("").to_string(),
            );
            if seen.insert(key) {
                resources.push(resource);
            }
        }
    }

    render(&ctx, search::searchset(resources, &ctx.negotiation))
}

async fn find_by_id(ctx: &RequestCtx, id: &str) -> Result<Value> {
    for catalog in ctx.endpoint.provider.library().concept_map_providers() {
        if let Some(resource) = catalog
            .fetch_by_id(id)
            .await
            .map_err(|e| Error::Internal(anyhow::anyhow!(e)))?
        {
            return Ok(resource);
        }
    }
    Err(Error::NotFound(format!("ConceptMap/{id}")))
}

pub async fn read(
    State(state): State<AppState>,
    Extension(EndpointPath(path)): Extension<EndpointPath>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Path(id): Path<String>,
) -> Result<Response> {
    if id.starts_with('$') {
        return Err(Error::NotFound(format!("ConceptMap/{id}")));
    }
    let ctx = build_ctx(&state, &path, &headers, &query, &request_id)?;
    let resource = find_by_id(&ctx, &id).await?;
    render(&ctx, resource)
}

fn render_translation(ctx: &RequestCtx, matches: Vec<fhirsmith_library::TranslationMatch>) -> Result<Response> {
    let result = !matches.is_empty();
    let mut parameter = vec![json!({"name": "result", "valueBoolean": result})];
    for m in matches {
        parameter.push(json!({"name": "match", "part": [
            {"name": "equivalence", "valueCode": m.equivalence},
            {"name": "concept", "valueCoding": {
                "system": m.system,
                "code": m.code,
                "display": m.display,
            }},
        ]}));
    }
    render(ctx, json!({"resourceType": "Parameters", "parameter": parameter}))
}

async fn translate(
    ctx: RequestCtx,
    concept_map_url: String,
    system: String,
    code: String,
    target_system: Option<String>,
) -> Result<Response> {
    let matches = ctx
        .endpoint
        .engine
        .translate(
            &ctx.op,
            TranslateParameters { concept_map_url, system, code, target_system },
        )
        .await?;
    render_translation(&ctx, matches)
}

pub async fn translate_type(
    State(state): State<AppState>,
    Extension(EndpointPath(path)): Extension<EndpointPath>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response> {
    let ctx = build_ctx(&state, &path, &headers, &query, &request_id)?;
    let params_map = params::merge_params(&query, &params::parse_body(&body, &headers)?);
    let concept_map_url = params::require(&params_map, "url")?;
    let system = params::require(&params_map, "system")?;
    let code = params::require(&params_map, "code")?;
    let target_system = single(&params_map, "target");
    translate(ctx, concept_map_url, system, code, target_system).await
}

pub async fn translate_instance(
    State(state): State<AppState>,
    Extension(EndpointPath(path)): Extension<EndpointPath>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response> {
    let ctx = build_ctx(&state, &path, &headers, &query, &request_id)?;
    let resource = find_by_id(&ctx, &id).await?;
    let concept_map_url = resource
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::NotFound(format!("ConceptMap/{id}")))?
        .to_string();
    let params_map = params::merge_params(&query, &params::parse_body(&body, &headers)?);
    let system = params::require(&params_map, "system")?;
    let code = params::require(&params_map, "code")?;
    let target_system = single(&params_map, "target");
    translate(ctx, concept_map_url, system, code, target_system).await
}

/// `$closure` (spec §4.8 routing table): a stateless pass over the
/// submitted `concept` parameters (each `system|code`), translating
/// each in turn against `name`'s accumulated map. This specifies the
/// interface closure clients expect — the incremental table state a
/// full transitive-closure implementation keeps belongs to the
/// catalog layer, not this dispatcher.
pub async fn closure(
    State(state): State<AppState>,
    Extension(EndpointPath(path)): Extension<EndpointPath>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response> {
    let ctx = build_ctx(&state, &path, &headers, &query, &request_id)?;
    let params_map = params::merge_params(&query, &params::parse_body(&body, &headers)?);
    let name = params::require(&params_map, "name")?;
    let concepts = params::all(&params_map, "concept");

    let mut parameter = vec![json!({"name": "name", "valueString": name.clone()})];
    for concept in concepts {
        let (system, code) = parse_system_code(&concept)?;
        ctx.op.dead_check("conceptmap:closure")?;
        let matches = ctx
            .endpoint
            .engine
            .translate(
                &ctx.op,
                TranslateParameters {
                    concept_map_url: name.clone(),
                    system: system.to_string(),
                    code: code.to_string(),
                    target_system: None,
                },
            )
            .await?;
        for m in matches {
            parameter.push(json!({"name": "concept", "part": [
                {"name": "equivalence", "valueCode": m.equivalence},
                {"name": "concept", "valueCoding": {"system": m.system, "code": m.code, "display": m.display}},
            ]}));
        }
    }
    render(&ctx, json!({"resourceType": "Parameters", "parameter": parameter}))
}

/// Splits a `$closure` `concept` parameter's `system|code` shape.
fn parse_system_code(concept: &str) -> Result<(&str, &str)> {
    concept
        .split_once('|')
        .ok_or_else(|| Error::InvalidParameter(format!("'concept' must be 'system|code', got '{concept}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_system_and_code() {
        assert_eq!(parse_system_code("http://snomed.info/sct|73211009").unwrap(), ("http://snomed.info/sct", "73211009"));
    }

    #[test]
    fn rejects_missing_separator() {
        assert!(parse_system_code("73211009").is_err());
    }
}
