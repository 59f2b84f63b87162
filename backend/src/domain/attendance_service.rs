use chrono::{Local, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use super::errors::AttendanceError;
use crate::storage::{AttendanceStorage, DbConnection, MinistryStorage, PersonStorage, RegistrationOutcome};
use shared::{
    is_valid_email, meets_min_name_length, AttendanceRecord, CheckInRequest, CheckInResponse,
    LookupUserResponse, PersonRef, MIN_NAME_LENGTH,
};

/// Service behind the lookup, check-in and today's-attendance endpoints
#[derive(Clone)]
pub struct AttendanceService {
    people: Arc<dyn PersonStorage>,
    attendance: Arc<dyn AttendanceStorage>,
    ministries: Arc<dyn MinistryStorage>,
}

impl AttendanceService {
    pub fn new(
        people: Arc<dyn PersonStorage>,
        attendance: Arc<dyn AttendanceStorage>,
        ministries: Arc<dyn MinistryStorage>,
    ) -> Self {
        Self {
            people,
            attendance,
            ministries,
        }
    }

    /// Create a service where every store is the same database
    pub fn from_db(db: Arc<DbConnection>) -> Self {
        Self::new(db.clone(), db.clone(), db)
    }

    /// The calendar day a check-in counts towards
    pub fn service_date() -> NaiveDate {
        Local::now().date_naive()
    }

    /// Resolve a typed name to a person and today's check-in status
    pub async fn lookup_user(&self, first_name: &str, last_name: &str) -> Result<LookupUserResponse, AttendanceError> {
        info!("Looking up person: first_name={}, last_name={}", first_name, last_name);

        Self::validate_names(first_name, last_name)?;

        let person = self.resolve_by_name(first_name, last_name).await?;
        let response = match person {
            Some(person) => {
                let already = self
                    .attendance
                    .has_attendance_on(&person.id, Self::service_date())
                    .await?;
                info!("Found {} ({}), already checked in today: {}", person.full_name(), person.id, already);
                LookupUserResponse::found(person, already)
            }
            None => {
                info!("No person matches {} {}", first_name.trim(), last_name.trim());
                LookupUserResponse::not_found()
            }
        };

        Ok(response)
    }

    /// Check a person in for today, registering them first when unknown.
    ///
    /// Fails with [`AttendanceError::DuplicateCheckIn`] when the resolved person
    /// already has a record for today.
    pub async fn check_in(&self, request: CheckInRequest) -> Result<CheckInResponse, AttendanceError> {
        info!(
            "Check-in request: first_name={}, last_name={}, person_id={:?}",
            request.first_name, request.last_name, request.person_id
        );

        Self::validate_names(&request.first_name, &request.last_name)?;
        let ministry_id = self.validate_ministry(request.ministry_id.as_deref()).await?;

        let existing = match request.person_id.as_deref() {
            Some(person_id) => Some(
                self.people
                    .get_person(person_id)
                    .await?
                    .ok_or_else(|| AttendanceError::PersonNotFound(person_id.to_string()))?,
            ),
            None => self.resolve_by_name(&request.first_name, &request.last_name).await?,
        };

        let today = Self::service_date();

        match existing {
            Some(person) => self.check_in_existing(person, ministry_id, today).await,
            None => self.register_and_check_in(request, ministry_id, today).await,
        }
    }

    /// All check-ins recorded today, most recent first
    pub async fn today_attendance(&self) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        let today = Self::service_date();
        let records = self.attendance.list_attendance_on(today).await?;
        info!("Found {} check-ins for {}", records.len(), today);
        Ok(records)
    }

    async fn check_in_existing(
        &self,
        person: PersonRef,
        ministry_id: Option<String>,
        today: NaiveDate,
    ) -> Result<CheckInResponse, AttendanceError> {
        if self.attendance.has_attendance_on(&person.id, today).await? {
            warn!("Duplicate check-in rejected for {} ({})", person.full_name(), person.id);
            return Err(AttendanceError::DuplicateCheckIn { name: person.full_name() });
        }

        let record = AttendanceRecord {
            id: AttendanceRecord::generate_id(),
            person_id: person.id.clone(),
            check_in_time: Utc::now(),
            is_first_time_visitor: false,
            ministry_id,
            person: Some(person.clone()),
        };

        // The pre-check can race another request; the store has the final say
        if !self.attendance.try_store_attendance(&record, today).await? {
            warn!("Concurrent duplicate check-in rejected for {} ({})", person.full_name(), person.id);
            return Err(AttendanceError::DuplicateCheckIn { name: person.full_name() });
        }

        info!("Checked in {} ({}) with record {}", person.full_name(), person.id, record.id);

        Ok(CheckInResponse {
            success_message: format!("{} checked in successfully", person.full_name()),
            user: person,
            is_new_member: false,
            attendance: record,
        })
    }

    async fn register_and_check_in(
        &self,
        request: CheckInRequest,
        ministry_id: Option<String>,
        today: NaiveDate,
    ) -> Result<CheckInResponse, AttendanceError> {
        let email = non_empty(request.email.as_deref())
            .ok_or_else(|| AttendanceError::Validation("Email is required to register a new member".to_string()))?;
        if !is_valid_email(&email) {
            return Err(AttendanceError::Validation(format!("Invalid email address: {}", email)));
        }

        let person = PersonRef {
            id: PersonRef::generate_id(),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            email: Some(email),
            phone: non_empty(request.phone.as_deref()),
        };

        let record = AttendanceRecord {
            id: AttendanceRecord::generate_id(),
            person_id: person.id.clone(),
            check_in_time: Utc::now(),
            is_first_time_visitor: true,
            ministry_id,
            person: Some(person.clone()),
        };

        match self
            .attendance
            .register_and_store_attendance(&person, &record, today)
            .await?
        {
            RegistrationOutcome::Registered => {}
            RegistrationOutcome::CheckedInExisting { person, record } => {
                warn!(
                    "{} was registered by a concurrent request; checked in {} instead",
                    person.full_name(),
                    person.id
                );
                return Ok(CheckInResponse {
                    success_message: format!("{} checked in successfully", person.full_name()),
                    user: person,
                    is_new_member: false,
                    attendance: record,
                });
            }
            RegistrationOutcome::Duplicate(existing) => {
                warn!("Concurrent duplicate registration rejected for {} ({})", existing.full_name(), existing.id);
                return Err(AttendanceError::DuplicateCheckIn {
                    name: existing.full_name(),
                });
            }
        }

        info!("Registered and checked in {} ({})", person.full_name(), person.id);

        Ok(CheckInResponse {
            success_message: format!("Welcome, {}! Registered and checked in", person.full_name()),
            user: person,
            is_new_member: true,
            attendance: record,
        })
    }

    async fn resolve_by_name(&self, first_name: &str, last_name: &str) -> Result<Option<PersonRef>, AttendanceError> {
        let mut matches = self.people.find_people_by_name(first_name, last_name).await?;
        if matches.len() > 1 {
            warn!(
                "{} people named {} {}; using the earliest registration",
                matches.len(),
                first_name.trim(),
                last_name.trim()
            );
        }
        Ok(if matches.is_empty() { None } else { Some(matches.swap_remove(0)) })
    }

    async fn validate_ministry(&self, ministry_id: Option<&str>) -> Result<Option<String>, AttendanceError> {
        let Some(ministry_id) = non_empty(ministry_id) else {
            return Ok(None);
        };

        if self.ministries.get_ministry(&ministry_id).await?.is_none() {
            return Err(AttendanceError::Validation(format!("Unknown ministry: {}", ministry_id)));
        }

        Ok(Some(ministry_id))
    }

    fn validate_names(first_name: &str, last_name: &str) -> Result<(), AttendanceError> {
        if !meets_min_name_length(first_name, MIN_NAME_LENGTH) {
            return Err(AttendanceError::Validation(format!(
                "First name must be at least {} characters",
                MIN_NAME_LENGTH
            )));
        }
        if !meets_min_name_length(last_name, MIN_NAME_LENGTH) {
            return Err(AttendanceError::Validation(format!(
                "Last name must be at least {} characters",
                MIN_NAME_LENGTH
            )));
        }
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
