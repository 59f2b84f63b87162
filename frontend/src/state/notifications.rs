//! Single-slot notification surface.
//!
//! Any part of the workflow may raise a message; only the renderer reads it.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Identifies this message so a late expiry timer cannot clear a newer one
    pub id: u64,
    pub kind: NotificationKind,
    pub message: String,
}

/// Holds at most one active notification
#[derive(Debug, Default)]
pub struct NotificationSlot {
    current: Option<Notification>,
    next_id: u64,
}

impl NotificationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current message; returns the id of the new one
    pub fn raise(&mut self, kind: NotificationKind, message: impl Into<String>) -> u64 {
        self.next_id += 1;
        self.current = Some(Notification {
            id: self.next_id,
            kind,
            message: message.into(),
        });
        self.next_id
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }

    /// Clear the message if it is still the one identified by `id`
    pub fn expire(&mut self, id: u64) -> bool {
        if self.current.as_ref().map(|n| n.id) == Some(id) {
            self.current = None;
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }
}
