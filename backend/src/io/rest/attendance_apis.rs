//! # REST API for Attendance
//!
//! Identity lookup, check-in and today's attendance list.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use tracing::info;

use super::error_response;
use crate::AppState;
use shared::{CheckInRequest, LookupUserQuery};

/// Resolve a typed name to a person and today's check-in status
pub async fn lookup_user(
    State(state): State<AppState>,
    Query(query): Query<LookupUserQuery>,
) -> impl IntoResponse {
    info!("GET /api/attendance/lookup - query: {:?}", query);

    match state
        .attendance_service
        .lookup_user(&query.first_name, &query.last_name)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Check a person in for today, registering them first when unknown
pub async fn check_in(
    State(state): State<AppState>,
    Json(request): Json<CheckInRequest>,
) -> impl IntoResponse {
    info!("POST /api/attendance/check-in - request: {:?}", request);

    match state.attendance_service.check_in(request).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => error_response(e),
    }
}

/// List every check-in recorded today
pub async fn get_today_attendance(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/attendance/today");

    match state.attendance_service.today_attendance().await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => error_response(e),
    }
}
