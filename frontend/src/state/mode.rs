//! Mode Controller: the check-in state machine.
//!
//! ```text
//!              debounce elapsed                 found, not checked in
//! Search(Idle) ───────────────► Search(Pending) ─────────────────────► QuickCheckIn
//!      ▲                              │  │       found, checked in
//!      │ name edited / reset          │  └───────────────────────────► Search(AlreadyCheckedIn)
//!      └──────────────────────────────┤          not found / failed
//!                                     └──────────────────────────────► NewMember
//! ```
//!
//! Every lookup carries a sequence number; only the latest issued one may
//! change the mode.

use shared::{meets_min_name_length, LookupUserResponse, PersonRef};
use tracing::{debug, warn};

use super::notifications::NotificationKind;
use crate::services::api::ApiError;

/// The name currently typed into the form
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameQuery {
    pub first_name: String,
    pub last_name: String,
}

impl NameQuery {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// Both names are long enough to be looked up
    pub fn is_resolvable(&self, min_length: usize) -> bool {
        meets_min_name_length(&self.first_name, min_length) && meets_min_name_length(&self.last_name, min_length)
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

/// Settled result of one resolver call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found {
        person: PersonRef,
        already_checked_in_today: bool,
    },
    NotFound,
    /// The lookup itself failed; treated like `NotFound`
    Failed(String),
}

impl LookupOutcome {
    pub fn from_response(result: Result<LookupUserResponse, ApiError>) -> Self {
        match result {
            Ok(LookupUserResponse {
                exists: true,
                user: Some(person),
                already_checked_in_today,
            }) => LookupOutcome::Found {
                person,
                already_checked_in_today,
            },
            Ok(LookupUserResponse { exists: true, user: None, .. }) => {
                warn!("Lookup reported a match without a person; treating as not found");
                LookupOutcome::NotFound
            }
            Ok(_) => LookupOutcome::NotFound,
            Err(e) => LookupOutcome::Failed(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStatus {
    /// Waiting for input (or for the debounce window to pass)
    Idle,
    /// Lookup `seq` is in flight
    Pending { seq: u64 },
    /// The typed name matched someone already checked in today
    AlreadyCheckedIn(PersonRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Search(SearchStatus),
    QuickCheckIn(PersonRef),
    NewMember,
}

impl Mode {
    /// Submission is only possible once the name resolved to a check-in path
    pub fn allows_submit(&self) -> bool {
        matches!(self, Mode::QuickCheckIn(_) | Mode::NewMember)
    }

    pub fn is_lookup_pending(&self) -> bool {
        matches!(self, Mode::Search(SearchStatus::Pending { .. }))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mode::Search(SearchStatus::Idle) => "search",
            Mode::Search(SearchStatus::Pending { .. }) => "search (looking up)",
            Mode::Search(SearchStatus::AlreadyCheckedIn(_)) => "search (already checked in)",
            Mode::QuickCheckIn(_) => "quick check-in",
            Mode::NewMember => "new member",
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Search(SearchStatus::Idle)
    }
}

/// Message the workflow should surface after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeNotice {
    pub kind: NotificationKind,
    pub message: String,
}

impl ModeNotice {
    fn new(kind: NotificationKind, message: String) -> Self {
        Self { kind, message }
    }
}

#[derive(Debug, Default)]
pub struct ModeController {
    mode: Mode,
    last_issued: u64,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// First or last name changed: any lookup result or in-flight lookup is discarded
    pub fn name_edited(&mut self) {
        if self.mode != Mode::Search(SearchStatus::Idle) {
            debug!(component = "mode-controller", "Name edited in {}; back to search", self.mode.label());
        }
        self.mode = Mode::Search(SearchStatus::Idle);
    }

    /// Debounce window elapsed for a resolvable name; returns the lookup's sequence number
    pub fn begin_lookup(&mut self) -> u64 {
        self.last_issued += 1;
        self.mode = Mode::Search(SearchStatus::Pending { seq: self.last_issued });
        self.last_issued
    }

    /// Whether `seq` is the lookup the controller is still waiting for
    pub fn is_current(&self, seq: u64) -> bool {
        self.mode == Mode::Search(SearchStatus::Pending { seq })
    }

    /// Apply a settled lookup. Returns `None`, leaving the mode untouched, when
    /// the result belongs to a superseded lookup.
    pub fn apply_lookup(&mut self, seq: u64, outcome: LookupOutcome, query: &NameQuery) -> Option<ModeNotice> {
        if !self.is_current(seq) {
            debug!(
                component = "mode-controller",
                "Discarding stale lookup {} (latest issued {}, mode {})",
                seq,
                self.last_issued,
                self.mode.label()
            );
            return None;
        }

        let (mode, notice) = match outcome {
            LookupOutcome::Found {
                person,
                already_checked_in_today: true,
            } => {
                let message = format!("{} is already checked in today.", person.full_name());
                (
                    Mode::Search(SearchStatus::AlreadyCheckedIn(person)),
                    ModeNotice::new(NotificationKind::Warning, message),
                )
            }
            LookupOutcome::Found {
                person,
                already_checked_in_today: false,
            } => {
                let message = format!("Welcome back, {}! Ready for quick check-in.", person.full_name());
                (
                    Mode::QuickCheckIn(person),
                    ModeNotice::new(NotificationKind::Success, message),
                )
            }
            LookupOutcome::NotFound => (
                Mode::NewMember,
                ModeNotice::new(
                    NotificationKind::Warning,
                    format!(
                        "No member found for {}. Please complete registration.",
                        query.display_name()
                    ),
                ),
            ),
            LookupOutcome::Failed(reason) => {
                warn!(component = "mode-controller", "Lookup {} failed: {}", seq, reason);
                (
                    Mode::NewMember,
                    ModeNotice::new(
                        NotificationKind::Warning,
                        format!(
                            "Could not look up {}; continuing with registration.",
                            query.display_name()
                        ),
                    ),
                )
            }
        };

        debug!(component = "mode-controller", "Lookup {} settled: {}", seq, mode.label());
        self.mode = mode;
        Some(notice)
    }

    /// Explicit reset
    pub fn reset(&mut self) {
        self.mode = Mode::Search(SearchStatus::Idle);
    }
}
