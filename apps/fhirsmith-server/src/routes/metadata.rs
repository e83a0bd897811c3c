//! `/metadata` and `/$versions` (spec §4.8): capability advertisement.
//! Both are built as ad-hoc JSON trees rather than typed models, the
//! same way the dispatcher treats every other FHIR resource it only
//! needs to shape once and never parse back.

use std::collections::HashMap;

use axum::extract::{Extension, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::content_negotiation::ContentNegotiation;
use crate::error::Result;
use crate::routes::{build_ctx, render, EndpointPath};
use crate::middleware::RequestId;
use crate::state::AppState;

const FHIR_SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// `GET [base]/metadata[?mode=terminology]`. `mode=terminology` answers
/// with a `TerminologyCapabilities` resource naming the endpoint's
/// registered systems; otherwise a minimal read-only
/// `CapabilityStatement`.
pub async fn capability_statement(
    State(state): State<AppState>,
    Extension(EndpointPath(path)): Extension<EndpointPath>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response> {
    let ctx = build_ctx(&state, &path, &headers, &query, &request_id)?;

    if query.get("mode").map(String::as_str) == Some("terminology") {
        let code_systems: Vec<_> = ctx
            .endpoint
            .provider
            .library()
            .code_systems()
            .values()
            .map(|cs| {
                json!({
                    "uri": cs.url.clone(),
                    "version": cs.version.clone().map(|v| vec![json!({"code": v})]).unwrap_or_default(),
                })
            })
            .collect();

        let resource = json!({
            "resourceType": "TerminologyCapabilities",
            "status": "active",
            "date": chrono::Utc::now().to_rfc3339(),
            "kind": "instance",
            "software": {"name": "fhirsmith-server", "version": FHIR_SERVER_VERSION},
            "fhirVersion": ctx.endpoint.fhir_version,
            "codeSystem": code_systems,
            "expansion": {"paging": true},
            "validateCode": {"translations": false},
            "closure": {"translation": true},
        });
        return render(&ctx, resource);
    }

    let resource = json!({
        "resourceType": "CapabilityStatement",
        "status": "active",
        "date": chrono::Utc::now().to_rfc3339(),
        "kind": "instance",
        "software": {"name": "fhirsmith-server", "version": FHIR_SERVER_VERSION},
        "fhirVersion": ctx.endpoint.fhir_version,
        "format": ["json", "xml"],
        "rest": [{
            "mode": "server",
            "resource": [
                {
                    "type": "CodeSystem",
                    "interaction": [{"code": "search-type"}, {"code": "read"}],
                    "operation": [
                        {"name": "lookup", "definition": "http://hl7.org/fhir/OperationDefinition/CodeSystem-lookup"},
                        {"name": "subsumes", "definition": "http://hl7.org/fhir/OperationDefinition/CodeSystem-subsumes"},
                        {"name": "validate-code", "definition": "http://hl7.org/fhir/OperationDefinition/CodeSystem-validate-code"},
                    ],
                },
                {
                    "type": "ValueSet",
                    "interaction": [{"code": "search-type"}, {"code": "read"}],
                    "operation": [
                        {"name": "expand", "definition": "http://hl7.org/fhir/OperationDefinition/ValueSet-expand"},
                        {"name": "validate-code", "definition": "http://hl7.org/fhir/OperationDefinition/ValueSet-validate-code"},
                    ],
                },
                {
                    "type": "ConceptMap",
                    "interaction": [{"code": "search-type"}, {"code": "read"}],
                    "operation": [
                        {"name": "translate", "definition": "http://hl7.org/fhir/OperationDefinition/ConceptMap-translate"},
                        {"name": "closure", "definition": "http://hl7.org/fhir/OperationDefinition/ConceptMap-closure"},
                    ],
                },
            ],
        }],
    });
    render(&ctx, resource)
}

/// `GET [base]/$versions`: lists every configured endpoint's mount
/// path and pinned FHIR version, so a client can discover which
/// endpoint to talk to for a given release (spec §4.8).
pub async fn versions(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    let parameter: Vec<_> = state
        .all_endpoints()
        .map(|endpoint| {
            json!({
                "name": "version",
                "part": [
                    {"name": "path", "valueString": endpoint.path},
                    {"name": "fhirVersion", "valueCode": endpoint.fhir_version},
                ]
            })
        })
        .collect();

    let negotiation = ContentNegotiation::from_request(&HashMap::new(), &headers);
    let formatter = crate::resource_formatter::ResourceFormatter::new(negotiation);
    let bytes = formatter
        .format(json!({"resourceType": "Parameters", "parameter": parameter}))
        .map_err(|e| crate::error::Error::Internal(anyhow::anyhow!(e)))?;
    let content_type = formatter.content_type();
    let mut response = (StatusCode::OK, bytes).into_response();
    if let Ok(value) = HeaderValue::from_str(&content_type) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    Ok(response)
}
