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

use super::service::{StatisticsError, StatisticsService};
use crate::domain::RepresentativeId;

#[derive(Debug, Default, Deserialize)]
pub struct StatisticsQuery {
    pub limit: Option<usize>,
}

/// Router exposing per-representative statistics.
pub fn statistics_router(service: Arc<StatisticsService>) -> Router {
    Router::new()
        .route(
            "/api/v1/representatives/:representative_id/statistics",
            get(statistics_handler),
        )
        .with_state(service)
}

pub(crate) async fn statistics_handler(
    State(service): State<Arc<StatisticsService>>,
    Path(representative_id): Path<String>,
    Query(query): Query<StatisticsQuery>,
) -> Response {
    let id = RepresentativeId(representative_id);
    // A bucket mismatch is reported through `data_valid`, never as an error status.
    match service.statistics(&id, query.limit).await {
        Ok(statistics) => (StatusCode::OK, axum::Json(statistics)).into_response(),
        Err(StatisticsError::NotFound(id)) => {
            let payload = json!({
                "error": "representative not found",
                "representative_id": id,
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
