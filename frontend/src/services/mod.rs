pub mod api;
#[cfg(test)]
pub mod mock_api;

pub use api::{ApiClient, ApiError, AttendanceApi};
