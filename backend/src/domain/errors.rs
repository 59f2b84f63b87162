use shared::ErrorCode;
use thiserror::Error;

/// Failures of the attendance and ministry services
#[derive(Debug, Error)]
pub enum AttendanceError {
    /// Request rejected before touching storage
    #[error("{0}")]
    Validation(String),

    /// The resolved person already has a record for today
    #[error("{name} is already checked in today")]
    DuplicateCheckIn { name: String },

    #[error("Person not found: {0}")]
    PersonNotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl AttendanceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AttendanceError::Validation(_) => ErrorCode::Validation,
            AttendanceError::DuplicateCheckIn { .. } => ErrorCode::DuplicateCheckIn,
            AttendanceError::PersonNotFound(_) => ErrorCode::NotFound,
            AttendanceError::Storage(_) => ErrorCode::Internal,
        }
    }
}
