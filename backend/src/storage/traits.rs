//! # Storage Traits
//!
//! Storage abstractions used by the domain layer. The SQLite `DbConnection`
//! implements all of them; services only see the traits.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use shared::{AttendanceRecord, Ministry, PersonRef};

/// Result of registering an unknown person together with their first record
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationOutcome {
    /// The person was created and the record stored
    Registered,
    /// Someone with the same name was registered first; the record was stored
    /// for that person instead
    CheckedInExisting {
        person: PersonRef,
        record: AttendanceRecord,
    },
    /// Someone with the same name exists and already has a record for the day
    Duplicate(PersonRef),
}

/// Member directory storage
#[async_trait]
pub trait PersonStorage: Send + Sync {
    /// Store a new person
    async fn store_person(&self, person: &PersonRef) -> Result<()>;

    /// Retrieve a specific person by ID
    async fn get_person(&self, person_id: &str) -> Result<Option<PersonRef>>;

    /// Case-insensitive match on trimmed first and last name.
    /// Returns the earliest registered person first.
    async fn find_people_by_name(&self, first_name: &str, last_name: &str) -> Result<Vec<PersonRef>>;
}

/// Attendance storage. At most one record exists per (person, service date).
#[async_trait]
pub trait AttendanceStorage: Send + Sync {
    /// Store a record for an existing person.
    /// Returns false, without storing anything, when the person already has a
    /// record for `service_date`.
    async fn try_store_attendance(&self, record: &AttendanceRecord, service_date: NaiveDate) -> Result<bool>;

    /// Register `person` and store `record` in one write transaction.
    ///
    /// The name is re-checked under the write lock: when a person with the same
    /// (case-insensitive, trimmed) name already exists, nobody is created and
    /// the record goes to the earliest such person, unless they already have a
    /// record for `service_date`.
    async fn register_and_store_attendance(
        &self,
        person: &PersonRef,
        record: &AttendanceRecord,
        service_date: NaiveDate,
    ) -> Result<RegistrationOutcome>;

    /// Whether the person has a record for `service_date`
    async fn has_attendance_on(&self, person_id: &str, service_date: NaiveDate) -> Result<bool>;

    /// All records for `service_date`, most recent check-in first, with the
    /// person reference joined in when it still exists
    async fn list_attendance_on(&self, service_date: NaiveDate) -> Result<Vec<AttendanceRecord>>;
}

/// Ministry storage (read-mostly; only seeding writes)
#[async_trait]
pub trait MinistryStorage: Send + Sync {
    async fn store_ministry(&self, ministry: &Ministry) -> Result<()>;

    async fn get_ministry(&self, ministry_id: &str) -> Result<Option<Ministry>>;

    async fn find_ministry_by_name(&self, name: &str) -> Result<Option<Ministry>>;

    /// One page of ministries ordered by name, plus the total count
    async fn list_ministries(&self, offset: u32, limit: u32) -> Result<(Vec<Ministry>, u64)>;
}
