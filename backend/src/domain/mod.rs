//! # Domain Module
//!
//! Business rules of the check-in backend.
//!
//! - **attendance_service**: identity lookup, check-in (with registration of
//!   unknown people) and today's attendance list
//! - **ministry_service**: paged ministry listing and start-up seeding
//! - **errors**: the error type shared by both services
//!
//! ## Business Rules
//!
//! - A person has at most one attendance record per calendar day
//! - Lookups and check-ins need first and last names of at least two characters
//! - Registering an unknown person requires a well-formed email
//! - Registration and the first check-in happen in one storage transaction

pub mod attendance_service;
pub mod errors;
pub mod ministry_service;

pub use attendance_service::AttendanceService;
pub use errors::AttendanceError;
pub use ministry_service::MinistryService;
