use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum number of characters a first or last name needs before a lookup is attempted
pub const MIN_NAME_LENGTH: usize = 2;

/// Identity snapshot of a person known to the member directory.
///
/// Person ID format: "person::<uuid v4>"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRef {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl PersonRef {
    /// Generate a new person ID
    pub fn generate_id() -> String {
        format!("person::{}", uuid::Uuid::new_v4())
    }

    /// "First Last", as shown on the roster and in notifications
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Query parameters of the identity lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupUserQuery {
    pub first_name: String,
    pub last_name: String,
}

/// Result of resolving a typed name against the member directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupUserResponse {
    pub exists: bool,
    #[serde(default)]
    pub user: Option<PersonRef>,
    /// True when the matched person already has an attendance record for today
    #[serde(default)]
    pub already_checked_in_today: bool,
}

impl LookupUserResponse {
    pub fn not_found() -> Self {
        Self {
            exists: false,
            user: None,
            already_checked_in_today: false,
        }
    }

    pub fn found(person: PersonRef, already_checked_in_today: bool) -> Self {
        Self {
            exists: true,
            user: Some(person),
            already_checked_in_today,
        }
    }
}

/// Input of a check-in (or combined registration and check-in)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub first_name: String,
    pub last_name: String,
    /// Required when the person is not yet registered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ministry_id: Option<String>,
    /// Resolved identity for a quick check-in; the server resolves by name when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_id: Option<String>,
}

/// Outcome of a successful check-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResponse {
    pub user: PersonRef,
    /// True when this request also registered the person
    pub is_new_member: bool,
    pub attendance: AttendanceRecord,
    pub success_message: String,
}

/// Attendance record ID format: "attendance::<uuid v4>"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub person_id: String,
    pub check_in_time: DateTime<Utc>,
    pub is_first_time_visitor: bool,
    #[serde(default)]
    pub ministry_id: Option<String>,
    /// Denormalized person reference; may be missing when the directory entry is gone
    #[serde(default)]
    pub person: Option<PersonRef>,
}

impl AttendanceRecord {
    /// Generate a new attendance record ID
    pub fn generate_id() -> String {
        format!("attendance::{}", uuid::Uuid::new_v4())
    }

    /// Name to render for this record, "Unknown" when the person reference is missing
    pub fn display_name(&self) -> String {
        self.person
            .as_ref()
            .map(PersonRef::full_name)
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ministry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Ministry {
    pub fn generate_id() -> String {
        format!("ministry::{}", uuid::Uuid::new_v4())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinistryListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinistryListResponse {
    pub data: Vec<Ministry>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

/// Machine-readable error category returned alongside an error message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    /// A same-day attendance record already exists for the resolved person
    DuplicateCheckIn,
    NotFound,
    Internal,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Validation => write!(f, "validation"),
            ErrorCode::DuplicateCheckIn => write!(f, "duplicate_check_in"),
            ErrorCode::NotFound => write!(f, "not_found"),
            ErrorCode::Internal => write!(f, "internal"),
        }
    }
}

/// JSON body of every non-2xx response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: ErrorCode,
}

/// True when the trimmed name is long enough to be looked up
pub fn meets_min_name_length(name: &str, min: usize) -> bool {
    name.trim().chars().count() >= min
}

/// Basic syntactic email check, equivalent to `^[^\s@]+@[^\s@]+\.[^\s@]+$`
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return false,
    };

    if local.is_empty() {
        return false;
    }

    // Some dot in the domain must have at least one character on each side
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}
