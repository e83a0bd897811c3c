//! Dispatcher routes (spec §4.8): one router is built per configured
//! endpoint and nested under its configured path in [`crate::router`].
//! Every handler here shares the same three-step shape: resolve the
//! endpoint and build an `OperationContext` ([`build_ctx`]), call into
//! the `Provider`/`TerminologyEngine` the endpoint owns, then render
//! the result through [`crate::resource_formatter::ResourceFormatter`]
//! ([`render`]).

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde_json::Value;

use fhirsmith_library::OperationContext;

use crate::content_negotiation::ContentNegotiation;
use crate::error::{Error, Result};
use crate::resource_formatter::ResourceFormatter;
use crate::state::{AppState, Endpoint};

pub mod code_system;
pub mod concept_map;
pub mod metadata;
pub mod value_set;

/// Carried as a request extension on every endpoint's nested router
/// (set once, at router-build time) so a handler can recover which
/// endpoint it was mounted under without threading the path through
/// every extractor signature.
#[derive(Debug, Clone)]
pub struct EndpointPath(pub String);

/// Resolved per-request state a handler needs: the endpoint it is
/// answering for, the operation context to pass into the engine, and
/// the negotiated response format.
pub struct RequestCtx {
    pub endpoint: Arc<Endpoint>,
    pub op: OperationContext,
    pub negotiation: ContentNegotiation,
}

pub(crate) fn build_ctx(
    state: &AppState,
    endpoint_path: &str,
    headers: &HeaderMap,
    query: &HashMap<String, String>,
    request_id: &str,
) -> Result<RequestCtx> {
    let endpoint = state
        .endpoint(endpoint_path)
        .ok_or_else(|| Error::Config(format!("no endpoint registered at '{endpoint_path}'")))?;
    let accept_language = headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok());
    let op = OperationContext::new(
        request_id.to_string(),
        accept_language,
        endpoint.resource_cache.clone(),
        endpoint.expansion_cache.clone(),
    );
    let negotiation = ContentNegotiation::from_request(query, headers);
    Ok(RequestCtx { endpoint, op, negotiation })
}

/// Render a resource/bundle through content negotiation (spec §4.8
/// step 5): JSON passthrough, XML via `fhirsmith-format`, HTML via the
/// shared page template.
pub(crate) fn render(ctx: &RequestCtx, resource: Value) -> Result<Response> {
    render_with_status(ctx, resource, StatusCode::OK)
}

pub(crate) fn render_with_status(ctx: &RequestCtx, resource: Value, status: StatusCode) -> Result<Response> {
    let formatter = ResourceFormatter::new(ctx.negotiation.clone());
    let bytes = formatter
        .format(resource)
        .map_err(|e| Error::Internal(anyhow::anyhow!(e)))?;
    let content_type = formatter.content_type();
    let mut response = (status, bytes).into_response();
    if let Ok(value) = header::HeaderValue::from_str(&content_type) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    Ok(response)
}

/// Every route a dispatcher endpoint answers (spec §4.8's routing
/// table), relative to the endpoint's mount path. Nested under that
/// path by [`crate::router::build`] with [`EndpointPath`] carried as a
/// layered extension.
pub fn terminology_router() -> Router<AppState> {
    Router::new()
        .route("/metadata", get(metadata::capability_statement))
        .route("/$versions", get(metadata::versions))
        .route(
            "/CodeSystem",
            get(code_system::search).post(code_system::search),
        )
        .route("/CodeSystem/$lookup", get(code_system::lookup_type).post(code_system::lookup_type))
        .route(
            "/CodeSystem/$subsumes",
            get(code_system::subsumes_type).post(code_system::subsumes_type),
        )
        .route(
            "/CodeSystem/$validate-code",
            get(code_system::validate_code_type).post(code_system::validate_code_type),
        )
        .route(
            "/CodeSystem/$batch-validate-code",
            get(code_system::batch_validate_code_type).post(code_system::batch_validate_code_type),
        )
        .route("/CodeSystem/:id", get(code_system::read))
        .route(
            "/CodeSystem/:id/$lookup",
            get(code_system::lookup_instance).post(code_system::lookup_instance),
        )
        .route(
            "/CodeSystem/:id/$subsumes",
            get(code_system::subsumes_instance).post(code_system::subsumes_instance),
        )
        .route(
            "/CodeSystem/:id/$validate-code",
            get(code_system::validate_code_instance).post(code_system::validate_code_instance),
        )
        .route(
            "/ValueSet",
            get(value_set::search).post(value_set::search),
        )
        .route(
            "/ValueSet/$expand",
            get(value_set::expand_type).post(value_set::expand_type),
        )
        .route(
            "/ValueSet/$validate-code",
            get(value_set::validate_code_type).post(value_set::validate_code_type),
        )
        .route(
            "/ValueSet/$batch-validate-code",
            get(value_set::batch_validate_code_type).post(value_set::batch_validate_code_type),
        )
        .route(
            "/ValueSet/$related",
            get(value_set::related_type).post(value_set::related_type),
        )
        .route("/ValueSet/:id", get(value_set::read))
        .route(
            "/ValueSet/:id/$expand",
            get(value_set::expand_instance).post(value_set::expand_instance),
        )
        .route(
            "/ValueSet/:id/$validate-code",
            get(value_set::validate_code_instance).post(value_set::validate_code_instance),
        )
        .route(
            "/ConceptMap",
            get(concept_map::search).post(concept_map::search),
        )
        .route(
            "/ConceptMap/$translate",
            get(concept_map::translate_type).post(concept_map::translate_type),
        )
        .route(
            "/ConceptMap/$closure",
            get(concept_map::closure).post(concept_map::closure),
        )
        .route("/ConceptMap/:id", get(concept_map::read))
        .route(
            "/ConceptMap/:id/$translate",
            get(concept_map::translate_instance).post(concept_map::translate_instance),
        )
}
