use chrono::{DateTime, Utc};
use shared::AttendanceRecord;

/// One rendered line of today's roster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRow {
    pub record_id: String,
    /// "Unknown" when the record has no person reference
    pub name: String,
    pub check_in_time: DateTime<Utc>,
    pub is_first_time_visitor: bool,
}

impl From<&AttendanceRecord> for RosterRow {
    fn from(record: &AttendanceRecord) -> Self {
        Self {
            record_id: record.id.clone(),
            name: record.display_name(),
            check_in_time: record.check_in_time,
            is_first_time_visitor: record.is_first_time_visitor,
        }
    }
}

/// Today's check-ins with fixed-size, 1-based pagination.
///
/// The page always stays within `[1, page_count()]`.
#[derive(Debug, Clone)]
pub struct RosterState {
    records: Vec<AttendanceRecord>,
    page: usize,
    page_size: usize,
}

impl RosterState {
    pub fn new(page_size: usize) -> Self {
        Self {
            records: Vec::new(),
            page: 1,
            page_size: page_size.max(1),
        }
    }

    /// Replace the whole roster with a fresh server response
    pub fn replace(&mut self, records: Vec<AttendanceRecord>) {
        self.records = records;
        self.clamp_page();
    }

    /// Move to `page`, clamped into range; returns the resulting page
    pub fn set_page(&mut self, page: usize) -> usize {
        self.page = page;
        self.clamp_page();
        self.page
    }

    pub fn next_page(&mut self) -> usize {
        self.set_page(self.page.saturating_add(1))
    }

    pub fn previous_page(&mut self) -> usize {
        self.set_page(self.page.saturating_sub(1))
    }

    pub fn reset_page(&mut self) {
        self.page = 1;
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    /// `max(1, ceil(total / page_size))`
    pub fn page_count(&self) -> usize {
        self.records.len().div_ceil(self.page_size).max(1)
    }

    pub fn current_rows(&self) -> Vec<RosterRow> {
        self.records
            .iter()
            .skip((self.page - 1) * self.page_size)
            .take(self.page_size)
            .map(RosterRow::from)
            .collect()
    }

    fn clamp_page(&mut self) {
        self.page = self.page.clamp(1, self.page_count());
    }
}
