//! HTTP surface tests.
//!
//! This suite validates:
//! - Analysis over GET query strings, form bodies and JSON bodies
//! - Context inclusion versus the `Link` header (`in-headers`)
//! - Errors rendered as `error` documents with their own status
//! - Plugin listing, inspection and lifecycle routes
//! - Health and published-context routes

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value as JsonValue;
use tempfile::TempDir;
use tower::ServiceExt;

use sentir_api::{router, AppState};
use sentir_engine::{Engine, EngineConfig};
use sentir_plugins::{PluginDescriptor, PluginRegistry, PluginState, RegistryConfig};

// ============================================================================
// HARNESS
// ============================================================================

struct Harness {
    app: Router,
    _data: TempDir,
}

async fn harness() -> Harness {
    let data = TempDir::new().unwrap();
    let registry = PluginRegistry::new(RegistryConfig::default().with_data_folder(data.path()));
    registry
        .load(vec![
            PluginDescriptor::new("split", "0.3"),
            PluginDescriptor::new("sentiment-random", "0.1"),
        ])
        .await
        .unwrap();
    for (name, result) in registry.activate_all().await {
        assert!(matches!(result, Ok(PluginState::Active)), "{name}");
    }

    let engine = Engine::new(registry, EngineConfig::default());
    Harness {
        app: router(AppState::new(engine)),
        _data: data,
    }
}

struct Reply {
    status: StatusCode,
    content_type: Option<String>,
    link: Option<String>,
    body: JsonValue,
}

async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let header_str = |name| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let content_type = header_str(header::CONTENT_TYPE);
    let link = header_str(header::LINK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
    Reply {
        status,
        content_type,
        link,
        body,
    }
}

async fn get(app: &Router, uri: &str) -> Reply {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post(app: &Router, uri: &str) -> Reply {
    send(app, Request::post(uri).body(Body::empty()).unwrap()).await
}

fn entry_texts(body: &JsonValue) -> Vec<String> {
    body["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["nif:isString"].as_str().unwrap().to_string())
        .collect()
}

// ============================================================================
// ANALYSIS
// ============================================================================

#[tokio::test]
async fn test_get_analysis_with_query_string() {
    let h = harness().await;
    let reply = get(
        &h.app,
        "/api/?i=Hello%20there.%20How%20are%20you%3F&algo=split,sentiment-random",
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.content_type.as_deref(), Some("application/ld+json"));
    assert!(reply.link.is_none());
    assert!(reply.body.get("@context").is_some());
    assert_eq!(reply.body["@type"], "results");
    assert_eq!(
        entry_texts(&reply.body),
        vec!["Hello there. How are you?", "Hello there.", "How are you?"]
    );
    // Terse output leaves out the provenance block.
    assert!(reply.body.get("analysis").is_none());
}

#[tokio::test]
async fn test_post_form_with_context_in_headers() {
    let h = harness().await;
    let request = Request::post("/api/")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("input=One.+Two.&algorithm=split&inHeaders=true&verbose=true"))
        .unwrap();
    let reply = send(&h.app, request).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.get("@context").is_none());
    let link = reply.link.unwrap();
    assert!(link.contains("rel=\"http://www.w3.org/ns/json-ld#context\""));
    assert_eq!(entry_texts(&reply.body), vec!["One. Two.", "One.", "Two."]);
    assert_eq!(reply.body["analysis"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_post_json_body() {
    let h = harness().await;
    let request = Request::post("/api")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            r#"{"input": "Fine.", "algorithm": ["sentiment-random"], "aliases": true}"#,
        ))
        .unwrap();
    let reply = send(&h.app, request).await;

    assert_eq!(reply.status, StatusCode::OK);
    let entry = &reply.body["entries"][0];
    assert_eq!(entry["text"], "Fine.");
    assert_eq!(entry["sentiments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_help_lists_parameters() {
    let h = harness().await;
    let reply = get(&h.app, "/api/?help=true").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body["valid_parameters"].get("input").is_some());
    assert!(reply.body["valid_parameters"].get("algorithm").is_some());
}

// ============================================================================
// ERRORS
// ============================================================================

#[tokio::test]
async fn test_missing_input_is_rendered_error() {
    let h = harness().await;
    let reply = get(&h.app, "/api/?algo=split").await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.content_type.as_deref(), Some("application/ld+json"));
    assert_eq!(reply.body["@type"], "error");
    assert_eq!(reply.body["status"], 404);
    assert_eq!(reply.body["kind"], "validation_error");
    let fields: Vec<_> = reply.body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap_or_default().to_string())
        .collect();
    assert!(fields.contains(&"input".to_string()));
}

#[tokio::test]
async fn test_unknown_plugin_and_bad_json() {
    let h = harness().await;
    let reply = get(&h.app, "/api/?i=hi&algo=nope").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["kind"], "plugin_not_found");

    let request = Request::post("/api/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let reply = send(&h.app, request).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["@type"], "error");
}

// ============================================================================
// PLUGINS
// ============================================================================

#[tokio::test]
async fn test_plugin_listing_and_info() {
    let h = harness().await;
    let reply = get(&h.app, "/api/plugins/").await;
    assert_eq!(reply.status, StatusCode::OK);
    let names: Vec<_> = reply.body["plugins"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["sentiment-random", "split"]);

    let reply = get(&h.app, "/api/plugins/split/").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["name"], "split");
    assert_eq!(reply.body["is_activated"], true);

    let reply = get(&h.app, "/api/plugins/missing/").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["kind"], "plugin_not_found");
}

#[tokio::test]
async fn test_lifecycle_routes() {
    let h = harness().await;

    let reply = post(&h.app, "/api/plugins/split/deactivate?sync=true").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["is_activated"], false);

    let reply = get(&h.app, "/api/?i=One.&algo=split").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["kind"], "not_activated");

    let reply = post(&h.app, "/api/plugins/split/activate?sync=1").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["is_activated"], true);

    let reply = get(&h.app, "/api/?i=One.&algo=split").await;
    assert_eq!(reply.status, StatusCode::OK);
}

// ============================================================================
// HEALTH AND CONTEXT
// ============================================================================

#[tokio::test]
async fn test_health_and_context() {
    let h = harness().await;
    let reply = get(&h.app, "/health").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "healthy");
    assert_eq!(reply.body["plugins"], 2);

    let reply = get(&h.app, "/api/contexts/context.jsonld").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.content_type.as_deref(), Some("application/ld+json"));
    assert!(reply.body["@context"].is_object());

    let reply = get(&h.app, "/api/contexts/other.jsonld").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}
