pub mod check_in_workflow;
pub mod kiosk;

pub use check_in_workflow::{CheckInView, CheckInWorkflow, WorkflowCommand};
pub use kiosk::{ministry_command, parse_command, render_view, KioskInput};
