//! Plain state owned by the check-in workflow. Nothing here does I/O.

pub mod form;
pub mod mode;
pub mod notifications;
pub mod roster;

pub use form::{CheckInForm, FormField, FormFieldError, FormValidation};
pub use mode::{LookupOutcome, Mode, ModeController, ModeNotice, NameQuery, SearchStatus};
pub use notifications::{Notification, NotificationKind, NotificationSlot};
pub use roster::{RosterRow, RosterState};
