use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use tracing::info;

use super::error_response;
use crate::AppState;
use shared::MinistryListQuery;

/// List ministries for the check-in selector
pub async fn list_ministries(
    State(state): State<AppState>,
    Query(query): Query<MinistryListQuery>,
) -> impl IntoResponse {
    info!("GET /api/ministries - query: {:?}", query);

    match state.ministry_service.list_ministries(query).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(e),
    }
}
