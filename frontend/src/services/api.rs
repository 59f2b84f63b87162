use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    AttendanceRecord, CheckInRequest, CheckInResponse, ErrorCode, ErrorResponse, LookupUserQuery,
    LookupUserResponse, MinistryListQuery, MinistryListResponse,
};
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Failure of a backend call, as seen by the workflow
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The server refused the check-in because a same-day record already exists
    #[error("{0}")]
    DuplicateCheckIn(String),

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Message supplied by the server, when there was one
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::DuplicateCheckIn(message) | ApiError::Rejected { message, .. } => {
                Some(message.as_str()).filter(|m| !m.is_empty())
            }
            ApiError::Network(_) | ApiError::Decode(_) => None,
        }
    }
}

/// Backend contracts consumed by the check-in workflow
#[async_trait]
pub trait AttendanceApi: Send + Sync {
    async fn lookup_user(&self, first_name: &str, last_name: &str) -> Result<LookupUserResponse, ApiError>;

    async fn check_in(&self, request: &CheckInRequest) -> Result<CheckInResponse, ApiError>;

    async fn get_today_attendance(&self) -> Result<Vec<AttendanceRecord>, ApiError>;

    async fn get_ministries(&self, page: u32, page_size: u32) -> Result<MinistryListResponse, ApiError>;
}

/// HTTP client for the check-in backend
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    /// Create a new API client with the default base URL
    pub fn new() -> Self {
        Self::with_base_url("http://localhost:3000".to_string())
    }

    /// Create a new API client with a custom base URL
    pub fn with_base_url(base_url: String) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { base_url, http }
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(error_from_response(status, &body))
        }
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AttendanceApi for ApiClient {
    async fn lookup_user(&self, first_name: &str, last_name: &str) -> Result<LookupUserResponse, ApiError> {
        let url = format!("{}/api/attendance/lookup", self.base_url);
        let query = LookupUserQuery {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        };

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::read_json(response).await
    }

    async fn check_in(&self, request: &CheckInRequest) -> Result<CheckInResponse, ApiError> {
        let url = format!("{}/api/attendance/check-in", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::read_json(response).await
    }

    async fn get_today_attendance(&self) -> Result<Vec<AttendanceRecord>, ApiError> {
        let url = format!("{}/api/attendance/today", self.base_url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::read_json(response).await
    }

    async fn get_ministries(&self, page: u32, page_size: u32) -> Result<MinistryListResponse, ApiError> {
        let url = format!("{}/api/ministries", self.base_url);
        let query = MinistryListQuery {
            page: Some(page),
            page_size: Some(page_size),
        };

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::read_json(response).await
    }
}

/// Classify a non-2xx response, preferring the server's `ErrorResponse` body
pub fn error_from_response(status: StatusCode, body: &str) -> ApiError {
    let parsed = serde_json::from_str::<ErrorResponse>(body).ok();

    let message = parsed
        .as_ref()
        .map(|e| e.error.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    let is_duplicate = status == StatusCode::CONFLICT
        || parsed.map(|e| e.code == ErrorCode::DuplicateCheckIn).unwrap_or(false);

    if is_duplicate {
        ApiError::DuplicateCheckIn(message)
    } else {
        ApiError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_is_duplicate_check_in() {
        let body = r#"{"error":"Jane Doe is already checked in today","code":"duplicate_check_in"}"#;
        let error = error_from_response(StatusCode::CONFLICT, body);
        assert_eq!(error, ApiError::DuplicateCheckIn("Jane Doe is already checked in today".to_string()));
        assert_eq!(error.server_message(), Some("Jane Doe is already checked in today"));
    }

    #[test]
    fn test_duplicate_code_wins_over_status() {
        let body = r#"{"error":"already here","code":"duplicate_check_in"}"#;
        let error = error_from_response(StatusCode::BAD_REQUEST, body);
        assert!(matches!(error, ApiError::DuplicateCheckIn(_)));
    }

    #[test]
    fn test_plain_text_and_empty_bodies() {
        let error = error_from_response(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(
            error,
            ApiError::Rejected {
                status: 502,
                message: "upstream down".to_string()
            }
        );

        let empty = error_from_response(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert!(matches!(empty, ApiError::Rejected { status: 500, .. }));
        assert_eq!(empty.server_message(), None);
    }

    #[test]
    fn test_network_errors_have_no_server_message() {
        assert_eq!(ApiError::Network("connection refused".to_string()).server_message(), None);
        assert_eq!(ApiError::Decode("eof".to_string()).server_message(), None);
    }
}
