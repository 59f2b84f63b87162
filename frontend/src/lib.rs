//! # Check-in kiosk
//!
//! Client side of the attendance check-in system. A kiosk resolves a typed
//! name against the backend while the user types, picks quick check-in or
//! new-member registration from the result, submits the check-in and keeps
//! today's roster current.
//!
//! ## Layout
//!
//! - `config`: timing and paging settings, overridable from the environment
//! - `services`: the backend API contract and its HTTP client
//! - `hooks`: debounce and periodic-refresh timers bound to cancellation tokens
//! - `state`: form, mode state machine, roster pagination and notifications
//! - `components`: the workflow actor and the text kiosk surface

pub mod components;
pub mod config;
pub mod hooks;
pub mod services;
pub mod state;

pub use components::{CheckInView, CheckInWorkflow, WorkflowCommand};
pub use config::CheckInConfig;
pub use services::{ApiClient, ApiError, AttendanceApi};
