//! Route handlers.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info};

use sentir_core::params::{api_params, merge_specs, resolve, web_params};
use sentir_core::{models, Error, Params};
use sentir_engine::{render, RenderOptions, JSONLD_CONTENT_TYPE};

use crate::error::{rendered_response, ApiError};
use crate::AppState;

const CONTEXT_NAME: &str = "context.jsonld";

// =============================================================================
// REQUEST PARAMETERS
// =============================================================================

fn query_params(query: HashMap<String, String>) -> Params {
    query
        .into_iter()
        .map(|(k, v)| (k, JsonValue::String(v)))
        .collect()
}

/// Merges the query string with the request body. Body values win.
///
/// JSON bodies must be objects. Form bodies are decoded pair by pair. Any
/// other body is taken as the `input` text unless the query already
/// supplies one.
fn request_params(
    query: HashMap<String, String>,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Params, Error> {
    let mut params = query_params(query);
    if body.is_empty() {
        return Ok(params);
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if content_type.starts_with("application/json") || content_type.starts_with(JSONLD_CONTENT_TYPE)
    {
        let value: JsonValue = serde_json::from_slice(body)
            .map_err(|e| Error::plugin(400, format!("Invalid JSON body: {}", e)))?;
        match value {
            JsonValue::Object(map) => params.extend(map),
            _ => return Err(Error::plugin(400, "JSON body must be an object")),
        }
    } else if content_type.is_empty()
        || content_type.starts_with("application/x-www-form-urlencoded")
    {
        for (key, value) in url::form_urlencoded::parse(body) {
            params.insert(key.into_owned(), JsonValue::String(value.into_owned()));
        }
    } else if !params.contains_key("input") && !params.contains_key("i") {
        let text = String::from_utf8_lossy(body).into_owned();
        params.insert("input".into(), JsonValue::String(text));
    }
    Ok(params)
}

/// Resolves the output switches of a request. Requests whose switches do
/// not resolve fall back to the raw values.
fn output(state: &AppState, raw: &Params) -> (Params, RenderOptions) {
    let specs = merge_specs(&api_params(), &web_params());
    let resolved = resolve(raw, &specs).unwrap_or_else(|_| raw.clone());
    let options = RenderOptions::from_params(&resolved, &state.engine.config().context_uri);
    (resolved, options)
}

fn flag(params: &Params, key: &str) -> bool {
    match params.get(key) {
        Some(JsonValue::Bool(b)) => *b,
        Some(JsonValue::String(s)) => matches!(s.to_lowercase().as_str(), "true" | "1" | ""),
        _ => false,
    }
}

// =============================================================================
// ANALYSIS
// =============================================================================

/// `GET|POST /api/`: runs an analysis and renders the results document.
pub async fn analyse(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let raw = request_params(query, &headers, &body)?;
    let (resolved, options) = output(&state, &raw);

    if flag(&resolved, "help") {
        return Ok(help(&state));
    }

    let results = state
        .engine
        .analyse(raw)
        .await
        .map_err(|e| ApiError::new(e, options.clone()))?;
    let rendered = render(&results, &options).map_err(|e| ApiError::new(e, options.clone()))?;
    Ok(rendered_response(rendered))
}

fn help(state: &AppState) -> Response {
    Json(json!({
        "@type": "help",
        "valid_parameters": state.engine.parameter_specs(),
    }))
    .into_response()
}

// =============================================================================
// PLUGINS
// =============================================================================

/// `GET /api/plugins/`: lists plugins matching the query filters.
pub async fn list_plugins(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let raw = query_params(query);
    let (_, options) = output(&state, &raw);
    let listing = state
        .engine
        .list_plugins(&raw)
        .await
        .map_err(|e| ApiError::new(e, options.clone()))?;
    debug!(
        plugin_count = listing.records("plugins").len(),
        "Listed plugins"
    );
    let rendered = render(&listing, &options).map_err(|e| ApiError::new(e, options.clone()))?;
    Ok(rendered_response(rendered))
}

/// `GET /api/plugins/{name}/`
pub async fn plugin_info(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let raw = query_params(query);
    let (_, options) = output(&state, &raw);
    let record = state
        .engine
        .plugin_info(&name)
        .await
        .map_err(|e| ApiError::new(e, options.clone()))?;
    let rendered = render(&record, &options).map_err(|e| ApiError::new(e, options.clone()))?;
    Ok(rendered_response(rendered))
}

/// `POST /api/plugins/{name}/activate?sync=`
pub async fn activate_plugin(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    transition(state, name, query_params(query), true).await
}

/// `POST /api/plugins/{name}/deactivate?sync=`
pub async fn deactivate_plugin(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    transition(state, name, query_params(query), false).await
}

/// Runs a lifecycle transition and answers with the plugin record.
/// Background transitions answer `202 Accepted`.
async fn transition(
    state: AppState,
    name: String,
    raw: Params,
    activate: bool,
) -> Result<Response, ApiError> {
    let (_, options) = output(&state, &raw);
    let sync = flag(&raw, "sync");

    let reached = if activate {
        state.engine.activate_plugin(&name, sync).await
    } else {
        state.engine.deactivate_plugin(&name, sync).await
    }
    .map_err(|e| ApiError::new(e, options.clone()))?;
    info!(
        plugin = %name,
        state = %reached,
        sync,
        "Plugin transition requested"
    );

    let record = state
        .engine
        .plugin_info(&name)
        .await
        .map_err(|e| ApiError::new(e, options.clone()))?;
    let mut rendered = render(&record, &options).map_err(|e| ApiError::new(e, options.clone()))?;
    if !sync {
        rendered.status = 202;
    }
    Ok(rendered_response(rendered))
}

// =============================================================================
// CONTEXT AND HEALTH
// =============================================================================

/// `GET /api/contexts/context.jsonld`: the context documents reference.
pub async fn context(Path(name): Path<String>) -> Result<Response, ApiError> {
    if name != CONTEXT_NAME {
        return Err(Error::plugin(404, format!("Unknown context: {}", name)).into());
    }
    let mut response = Json(json!({ "@context": models::base_context() })).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(JSONLD_CONTENT_TYPE),
    );
    Ok(response)
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "plugins": state.engine.registry().len().await,
    }))
}
