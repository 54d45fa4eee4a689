use super::common::*;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use std::sync::Arc;
use tower::ServiceExt;

use crate::lookup::{lookup_router, Autocomplete, FailureReason, LookupState};
use crate::store::InMemoryStore;

fn app(store: Arc<InMemoryStore>, upstream: Arc<ScriptedLookup>) -> Router {
    let state = LookupState {
        resolver: Arc::new(resolver(store.clone(), upstream)),
        autocomplete: Autocomplete::new(store.clone(), store),
    };
    lookup_router(state)
}

async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("route executes");
    let status = response.status();
    (status, read_json_body(response).await)
}

#[tokio::test]
async fn postal_lookup_returns_resolution() {
    let upstream = Arc::new(ScriptedLookup::district("Oakville", None));
    let (status, body) = get(app(seeded_store(), upstream), "/api/v1/lookup/postal/l6h0a1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["postal_code"], "L6H0A1");
    assert_eq!(body["representative"]["id"], "mp-east");
    assert_eq!(body["resolved_by"]["method"], "district");
    assert_eq!(body["resolved_by"]["strategy"], "alphabetical");
    assert_eq!(body["district_source"], "upstream");
}

#[tokio::test]
async fn postal_lookup_rejects_malformed_codes() {
    let upstream = Arc::new(ScriptedLookup::district("Oakville", None));
    let (status, body) = get(app(seeded_store(), upstream.clone()), "/api/v1/lookup/postal/123456").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .contains("not a valid postal code"));
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn postal_lookup_reports_not_found() {
    let upstream = Arc::new(ScriptedLookup::failing(FailureReason::NotFound));
    let (status, body) = get(app(seeded_store(), upstream), "/api/v1/lookup/postal/X0A0H0").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["postal_code"], "X0A0H0");
}

#[tokio::test]
async fn name_lookup_flags_ambiguity() {
    let upstream = Arc::new(ScriptedLookup::failing(FailureReason::Other));
    let (status, body) = get(app(seeded_store(), upstream), "/api/v1/lookup/name?q=martin").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ambiguous"], true);
    assert_eq!(body["matches"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn name_lookup_without_matches_is_not_found() {
    let upstream = Arc::new(ScriptedLookup::failing(FailureReason::Other));
    let (status, _) = get(app(seeded_store(), upstream.clone()), "/api/v1/lookup/name?q=nobody").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(app(seeded_store(), upstream), "/api/v1/lookup/name").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn autocomplete_returns_ranked_suggestions() {
    let upstream = Arc::new(ScriptedLookup::failing(FailureReason::Other));
    let (status, body) = get(app(seeded_store(), upstream), "/api/v1/autocomplete?q=oak").await;

    assert_eq!(status, StatusCode::OK);
    let suggestions = body["suggestions"].as_array().expect("suggestions");
    assert_eq!(suggestions[0]["kind"], "riding");
    assert_eq!(suggestions[0]["label"], "Oakville East");
    assert!(suggestions.len() <= 10);
}
