//! `/ValueSet` routes (spec §4.8): search, read, `$expand`,
//! `$validate-code`, `$batch-validate-code`, `$related`.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Extension, Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde_json::{json, Value};

use fhirsmith_library::{ExpandParameters, ValidateCodeParameters};

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
    for catalog in ctx.endpoint.provider.library().value_set_providers() {
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
    for catalog in ctx.endpoint.provider.library().value_set_providers() {
        if let Some(resource) = catalog
            .fetch_by_id(id)
            .await
            .map_err(|e| Error::Internal(anyhow::anyhow!(e)))?
        {
            return Ok(resource);
        }
    }
    Err(Error::NotFound(format!("ValueSet/{id}")))
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
        return Err(Error::NotFound(format!("ValueSet/{id}")));
    }
    let ctx = build_ctx(&state, &path, &headers, &query, &request_id)?;
    let resource = find_by_id(&ctx, &id).await?;
    render(&ctx, resource)
}

/// Distinguishes expansions of the same value set requested with
/// different filter/paging parameters, so they don't collide in the
/// [`fhirsmith_library::ExpansionCache`] (spec §4.7).
fn expand_fingerprint(filter_text: Option<&str>, offset: usize, count: Option<usize>) -> String {
    format!(
        "filter={}&offset={}&count={}",
        filter_text.unwrap_or(""),
        offset,
        count.map(|c| c.to_string()).unwrap_or_default(),
    )
}

async fn expand(ctx: RequestCtx, value_set_url: String, filter_text: Option<String>) -> Result<Response> {
    let fingerprint = expand_fingerprint(filter_text.as_deref(), ctx.negotiation.offset, ctx.negotiation.count);
    let cache_key = fhirsmith_library::ExpansionCache::key(&value_set_url, &fingerprint);
    if let Some(cached) = ctx.endpoint.expansion_cache.get(&cache_key) {
        return render(&ctx, cached);
    }

    let expansion = ctx
        .endpoint
        .engine
        .expand(
            &ctx.op,
            ExpandParameters {
                value_set_url: value_set_url.clone(),
                filter_text,
                offset: ctx.negotiation.offset,
                count: ctx.negotiation.count,
            },
        )
        .await?;

    let contains: Vec<Value> = expansion
        .concepts
        .iter()
        .map(|c| {
            json!({
                "system": c.system,
                "code": c.code,
                "display": c.display,
            })
        })
        .collect();

    let resource = json!({
        "resourceType": "ValueSet",
        "url": expansion.value_set_url,
        "expansion": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "total": expansion.total,
            "offset": ctx.negotiation.offset,
            "contains": contains,
        }
    });

    ctx.endpoint.expansion_cache.put(cache_key, resource.clone());
    render(&ctx, resource)
}

pub async fn expand_type(
    State(state): State<AppState>,
    Extension(EndpointPath(path)): Extension<EndpointPath>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response> {
    let ctx = build_ctx(&state, &path, &headers, &query, &request_id)?;
    let params_map = params::merge_params(&query, &params::parse_body(&body, &headers)?);
    let value_set_url = params::require(&params_map, "url")?;
    let filter_text = single(&params_map, "filter");
    expand(ctx, value_set_url, filter_text).await
}

pub async fn expand_instance(
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
    let value_set_url = resource
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::NotFound(format!("ValueSet/{id}")))?
        .to_string();
    let params_map = params::merge_params(&query, &params::parse_body(&body, &headers)?);
    let filter_text = single(&params_map, "filter");
    expand(ctx, value_set_url, filter_text).await
}

async fn validate_code(ctx: RequestCtx, value_set_url: String, system: String, code: String) -> Result<Response> {
    let result = ctx
        .endpoint
        .engine
        .validate_code(
            &ctx.op,
            ValidateCodeParameters { system, version: None, code, value_set_url: Some(value_set_url) },
        )
        .await?;
    let mut parameter = vec![json!({"name": "result", "valueBoolean": result.result})];
    if let Some(message) = result.message {
        parameter.push(json!({"name": "message", "valueString": message}));
    }
    if let Some(display) = result.display {
        parameter.push(json!({"name": "display", "valueString": display}));
    }
    render(&ctx, json!({"resourceType": "Parameters", "parameter": parameter}))
}

pub async fn validate_code_type(
    State(state): State<AppState>,
    Extension(EndpointPath(path)): Extension<EndpointPath>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response> {
    let ctx = build_ctx(&state, &path, &headers, &query, &request_id)?;
    let params_map = params::merge_params(&query, &params::parse_body(&body, &headers)?);
    let value_set_url = params::require(&params_map, "url")?;
    let system = params::require(&params_map, "system")?;
    let code = params::require(&params_map, "code")?;
    validate_code(ctx, value_set_url, system, code).await
}

pub async fn validate_code_instance(
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
    let value_set_url = resource
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::NotFound(format!("ValueSet/{id}")))?
        .to_string();
    let params_map = params::merge_params(&query, &params::parse_body(&body, &headers)?);
    let system = params::require(&params_map, "system")?;
    let code = params::require(&params_map, "code")?;
    validate_code(ctx, value_set_url, system, code).await
}

/// `$batch-validate-code` over one value set: a repeated `system`+`code`
/// pair per code, validated in turn.
pub async fn batch_validate_code_type(
    State(state): State<AppState>,
    Extension(EndpointPath(path)): Extension<EndpointPath>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response> {
    let ctx = build_ctx(&state, &path, &headers, &query, &request_id)?;
    let params_map = params::merge_params(&query, &params::parse_body(&body, &headers)?);
    let value_set_url = params::require(&params_map, "url")?;
    let systems = params::all(&params_map, "system");
    let codes = params::all(&params_map, "code");
    if codes.is_empty() || systems.len() != codes.len() {
        return Err(Error::InvalidParameter(
            "'system' and 'code' must repeat in matching pairs".to_string(),
        ));
    }

    let mut parts = Vec::with_capacity(codes.len());
    for (system, code) in systems.into_iter().zip(codes.into_iter()) {
        ctx.op.dead_check("valueset:batch-validate-code")?;
        let result = ctx
            .endpoint
            .engine
            .validate_code(
                &ctx.op,
                ValidateCodeParameters {
                    system: system.clone(),
                    version: None,
                    code: code.clone(),
                    value_set_url: Some(value_set_url.clone()),
                },
            )
            .await?;
        parts.push(json!({"name": "result", "part": [
            {"name": "system", "valueUri": system},
            {"name": "code", "valueCode": code},
            {"name": "result", "valueBoolean": result.result},
            {"name": "message", "valueString": result.message.unwrap_or_default()},
        ]}));
    }
    render(&ctx, json!({"resourceType": "Parameters", "parameter": parts}))
}

/// `$related` (spec §4.8 routing table, a non-standard convenience
/// operation): lists which codes in the value set's expansion subsume,
/// or are subsumed by, a given code.
pub async fn related_type(
    State(state): State<AppState>,
    Extension(EndpointPath(path)): Extension<EndpointPath>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response> {
    let ctx = build_ctx(&state, &path, &headers, &query, &request_id)?;
    let params_map = params::merge_params(&query, &params::parse_body(&body, &headers)?);
    let value_set_url = params::require(&params_map, "url")?;
    let system = params::require(&params_map, "system")?;
    let code = params::require(&params_map, "code")?;

    let expansion = ctx
        .endpoint
        .engine
        .expand(
            &ctx.op,
            ExpandParameters { value_set_url, filter_text: None, offset: 0, count: None },
        )
        .await?;

    let mut related = Vec::new();
    for concept in &expansion.concepts {
        if concept.system != system || concept.code == code {
            continue;
        }
        let relationship = ctx
            .endpoint
            .engine
            .subsumes(
                &ctx.op,
                fhirsmith_library::SubsumesParameters {
                    system: system.clone(),
                    version: None,
                    code_a: code.clone(),
                    code_b: concept.code.clone(),
                },
            )
            .await?;
        if !matches!(relationship, fhirsmith_library::SubsumptionRelationship::NotSubsumed) {
            related.push(json!({
                "name": "related",
                "part": [
                    {"name": "code", "valueCode": concept.code},
                    {"name": "display", "valueString": concept.display.clone().unwrap_or_default()},
                    {"name": "relationship", "valueCode": format!("{relationship:?}")},
                ]
            }));
        }
    }
    render(&ctx, json!({"resourceType": "Parameters", "parameter": related}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_distinguishes_filter_and_paging() {
        let a = expand_fingerprint(Some("diab"), 0, Some(20));
        let b = expand_fingerprint(Some("card"), 0, Some(20));
        let c = expand_fingerprint(Some("diab"), 20, Some(20));
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn fingerprint_is_stable_for_identical_inputs() {
        assert_eq!(expand_fingerprint(None, 0, None), expand_fingerprint(None, 0, None));
    }
}
