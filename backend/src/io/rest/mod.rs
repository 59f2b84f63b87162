//! # REST API Interface Layer
//!
//! HTTP endpoints for the check-in workflow. Handlers only translate between
//! JSON and the domain services; every domain error becomes a status code
//! plus an [`ErrorResponse`] body.
//!
//! | Method | Path | Status codes |
//! |---|---|---|
//! | GET | `/api/attendance/lookup?firstName=&lastName=` | 200, 400 |
//! | POST | `/api/attendance/check-in` | 201, 400, 404, 409 |
//! | GET | `/api/attendance/today` | 200 |
//! | GET | `/api/ministries?page=&pageSize=` | 200 |

pub mod attendance_apis;
pub mod ministry_apis;

pub use attendance_apis::*;
pub use ministry_apis::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::{error, warn};

use crate::domain::AttendanceError;
use shared::ErrorResponse;

/// Translate a domain error into an HTTP response
pub fn error_response(err: AttendanceError) -> Response {
    let status = match &err {
        AttendanceError::Validation(_) => StatusCode::BAD_REQUEST,
        AttendanceError::DuplicateCheckIn { .. } => StatusCode::CONFLICT,
        AttendanceError::PersonNotFound(_) => StatusCode::NOT_FOUND,
        AttendanceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let message = if status.is_server_error() {
        error!("Request failed: {:#}", err);
        "Internal server error".to_string()
    } else {
        warn!("Request rejected ({}): {}", status, err);
        err.to_string()
    };

    (
        status,
        Json(ErrorResponse {
            error: message,
            code: err.code(),
        }),
    )
        .into_response()
}
