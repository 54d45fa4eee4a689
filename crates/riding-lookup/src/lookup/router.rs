use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::autocomplete::Autocomplete;
use super::service::{NameResolution, RepresentativeResolver, ResolveError};

/// Shared state for the lookup endpoints.
#[derive(Clone)]
pub struct LookupState {
    pub resolver: Arc<RepresentativeResolver>,
    pub autocomplete: Autocomplete,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Router exposing postal code, name and autocomplete lookups.
pub fn lookup_router(state: LookupState) -> Router {
    Router::new()
        .route("/api/v1/lookup/postal/:code", get(postal_handler))
        .route("/api/v1/lookup/name", get(name_handler))
        .route("/api/v1/autocomplete", get(autocomplete_handler))
        .with_state(state)
}

pub(crate) async fn postal_handler(
    State(state): State<LookupState>,
    Path(code): Path<String>,
) -> Response {
    match state.resolver.resolve_by_postal_code(&code).await {
        Ok(resolution) => (StatusCode::OK, axum::Json(resolution)).into_response(),
        Err(ResolveError::Validation(error)) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Err(ResolveError::NotFound { postal_code }) => {
            let payload = json!({
                "error": "no representative found",
                "postal_code": postal_code,
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn name_handler(
    State(state): State<LookupState>,
    Query(query): Query<SearchQuery>,
) -> Response {
    match state.resolver.resolve_by_name(&query.q) {
        Ok(NameResolution::NotFound) => {
            let payload = json!({
                "error": "no representative matches",
                "query": query.q.trim(),
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Ok(resolution) => {
            let payload = json!({
                "matches": resolution.matches(),
                "ambiguous": matches!(resolution, NameResolution::Ambiguous(_)),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn autocomplete_handler(
    State(state): State<LookupState>,
    Query(query): Query<SearchQuery>,
) -> Response {
    match state.autocomplete.suggest(&query.q) {
        Ok(suggestions) => {
            let payload = json!({
                "suggestions": suggestions,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
