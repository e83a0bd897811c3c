//! `/CodeSystem` routes (spec §4.8): search, read, `$lookup`,
//! `$subsumes`, `$validate-code`, `$batch-validate-code`, at both
//! type and instance level.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Extension, Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde_json::{json, Value};

use fhirsmith_library::{LookupParameters, SubsumesParameters, SubsumptionRelationship, ValidateCodeParameters};

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
    for resource in ctx.endpoint.provider.library().code_systems().values() {
        let ptr = Arc::as_ptr(resource) as usize;
        if !seen.insert(ptr) {
            continue;
        }
        let value = serde_json::to_value(resource.as_ref())
            .map_err(|e| Error::Internal(anyhow::anyhow!(e)))?;
        if search::matches_params(&value, &flat) {
            resources.push(value);
        }
    }

    render(&ctx, search::searchset(resources, &ctx.negotiation))
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
        return Err(Error::NotFound(format!("CodeSystem/{id}")));
    }
    let ctx = build_ctx(&state, &path, &headers, &query, &request_id)?;
    let resource = find_by_id(&ctx, &id)?;
    render(&ctx, resource)
}

fn find_by_id(ctx: &RequestCtx, id: &str) -> Result<Value> {
    ctx.endpoint
        .provider
        .library()
        .code_systems()
        .values()
        .find(|cs| cs.id.as_deref() == Some(id))
        .map(|cs| serde_json::to_value(cs.as_ref()).unwrap_or(Value::Null))
        .ok_or_else(|| Error::NotFound(format!("CodeSystem/{id}")))
}

async fn lookup(ctx: RequestCtx, system: String, version: Option<String>, code: String) -> Result<Response> {
    let result = ctx
        .endpoint
        .engine
        .lookup(&ctx.op, LookupParameters { system, version, code })
        .await?;
    let Some(result) = result else {
        return Err(Error::NotFound("code not found".to_string()));
    };
    let mut parameter = vec![json!({"name": "name", "valueString": result.name.unwrap_or_default()})];
    if let Some(display) = result.display {
        parameter.push(json!({"name": "display", "valueString": display}));
    }
    if let Some(definition) = result.definition {
        parameter.push(json!({"name": "definition", "valueString": definition}));
    }
    for (code, value) in result.properties {
        parameter.push(json!({"name": "property", "part": [
            {"name": "code", "valueCode": code},
            {"name": "value", "valueString": value},
        ]}));
    }
    render(&ctx, json!({"resourceType": "Parameters", "parameter": parameter}))
}

pub async fn lookup_type(
    State(state): State<AppState>,
    Extension(EndpointPath(path)): Extension<EndpointPath>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response> {
    let ctx = build_ctx(&state, &path, &headers, &query, &request_id)?;
    let params_map = params::merge_params(&query, &params::parse_body(&body, &headers)?);
    let system = params::require(&params_map, "system")?;
    let code = params::require(&params_map, "code")?;
    let version = single(&params_map, "version");
    lookup(ctx, system, version, code).await
}

pub async fn lookup_instance(
    State(state): State<AppState>,
    Extension(EndpointPath(path)): Extension<EndpointPath>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response> {
    let ctx = build_ctx(&state, &path, &headers, &query, &request_id)?;
    let resource = find_by_id(&ctx, &id)?;
    let system = resource
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::NotFound(format!("CodeSystem/{id}")))?
        .to_string();
    let version = resource.get("version").and_then(Value::as_str).map(str::to_string);
    let params_map = params::merge_params(&query, &params::parse_body(&body, &headers)?);
    let code = params::require(&params_map, "code")?;
    lookup(ctx, system, version, code).await
}

async fn subsumes(
    ctx: RequestCtx,
    system: String,
    version: Option<String>,
    code_a: String,
    code_b: String,
) -> Result<Response> {
    let outcome = ctx
        .endpoint
        .engine
        .subsumes(&ctx.op, SubsumesParameters { system, version, code_a, code_b })
        .await?;
    let outcome = subsumption_code(outcome);
    render(
        &ctx,
        json!({"resourceType": "Parameters", "parameter": [{"name": "outcome", "valueCode": outcome}]}),
    )
}

pub async fn subsumes_type(
    State(state): State<AppState>,
    Extension(EndpointPath(path)): Extension<EndpointPath>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response> {
    let ctx = build_ctx(&state, &path, &headers, &query, &request_id)?;
    let params_map = params::merge_params(&query, &params::parse_body(&body, &headers)?);
    let system = params::require(&params_map, "system")?;
    let version = single(&params_map, "version");
    let code_a = params::require(&params_map, "codeA")?;
    let code_b = params::require(&params_map, "codeB")?;
    subsumes(ctx, system, version, code_a, code_b).await
}

pub async fn subsumes_instance(
    State(state): State<AppState>,
    Extension(EndpointPath(path)): Extension<EndpointPath>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response> {
    let ctx = build_ctx(&state, &path, &headers, &query, &request_id)?;
    let resource = find_by_id(&ctx, &id)?;
    let system = resource
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::NotFound(format!("CodeSystem/{id}")))?
        .to_string();
    let version = resource.get("version").and_then(Value::as_str).map(str::to_string);
    let params_map = params::merge_params(&query, &params::parse_body(&body, &headers)?);
    let code_a = params::require(&params_map, "codeA")?;
    let code_b = params::require(&params_map, "codeB")?;
    subsumes(ctx, system, version, code_a, code_b).await
}

async fn validate_code(
    ctx: RequestCtx,
    system: String,
    version: Option<String>,
    code: String,
) -> Result<Response> {
    let result = ctx
        .endpoint
        .engine
        .validate_code(
            &ctx.op,
            ValidateCodeParameters { system, version, code, value_set_url: None },
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
    let system = params::require(&params_map, "system")?;
    let version = single(&params_map, "version");
    let code = params::require(&params_map, "code")?;
    validate_code(ctx, system, version, code).await
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
    let resource = find_by_id(&ctx, &id)?;
    let system = resource
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::NotFound(format!("CodeSystem/{id}")))?
        .to_string();
    let version = resource.get("version").and_then(Value::as_str).map(str::to_string);
    let params_map = params::merge_params(&query, &params::parse_body(&body, &headers)?);
    let code = params::require(&params_map, "code")?;
    validate_code(ctx, system, version, code).await
}

/// `$batch-validate-code` (spec §4.8 routing table): validates every
/// `code` parameter (repeated) against one `system`/`version` in a
/// single round trip, returning one `result` part per code.
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
    let system = params::require(&params_map, "system")?;
    let version = single(&params_map, "version");
    let codes = params::all(&params_map, "code");
    if codes.is_empty() {
        return Err(Error::InvalidParameter("at least one 'code' parameter is required".to_string()));
    }

    let mut parts = Vec::with_capacity(codes.len());
    for code in codes {
        ctx.op.dead_check("batch-validate-code")?;
        let result = ctx
            .endpoint
            .engine
            .validate_code(
                &ctx.op,
                ValidateCodeParameters {
                    system: system.clone(),
                    version: version.clone(),
                    code: code.clone(),
                    value_set_url: None,
                },
            )
            .await?;
        parts.push(json!({"name": "result", "part": [
            {"name": "code", "valueCode": code},
            {"name": "result", "valueBoolean": result.result},
            {"name": "message", "valueString": result.message.unwrap_or_default()},
        ]}));
    }
    render(&ctx, json!({"resourceType": "Parameters", "parameter": parts}))
}

/// Maps a [`SubsumptionRelationship`] to the `outcome` value-set code
/// `$subsumes` responses use (spec §4.8).
fn subsumption_code(relationship: SubsumptionRelationship) -> &'static str {
    match relationship {
        SubsumptionRelationship::Equivalent => "equivalent",
        SubsumptionRelationship::Subsumes => "subsumes",
        SubsumptionRelationship::SubsumedBy => "subsumed-by",
        SubsumptionRelationship::NotSubsumed => "not-subsumed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subsumption_code_covers_every_relationship() {
        assert_eq!(subsumption_code(SubsumptionRelationship::Equivalent), "equivalent");
        assert_eq!(subsumption_code(SubsumptionRelationship::Subsumes), "subsumes");
        assert_eq!(subsumption_code(SubsumptionRelationship::SubsumedBy), "subsumed-by");
        assert_eq!(subsumption_code(SubsumptionRelationship::NotSubsumed), "not-subsumed");
    }
}
