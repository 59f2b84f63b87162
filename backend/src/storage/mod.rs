//! # Storage Module
//!
//! Persistence for people, attendance records and ministries.
//!
//! The domain layer depends only on the traits in [`traits`]; [`DbConnection`]
//! is the SQLite implementation. The one-record-per-person-per-day rule is
//! backed by a UNIQUE constraint, and registration re-checks the name inside its
//! write transaction, so the rule holds even when two check-ins race each other.

pub mod db;
pub mod traits;

pub use db::DbConnection;
pub use traits::{AttendanceStorage, MinistryStorage, PersonStorage, RegistrationOutcome};
