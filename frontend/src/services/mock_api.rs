//! In-memory backend used by the workflow tests.

use async_trait::async_trait;
use chrono::Utc;
use shared::{
    is_valid_email, AttendanceRecord, CheckInRequest, CheckInResponse, LookupUserResponse, Ministry,
    MinistryListResponse, PersonRef,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use super::api::{ApiError, AttendanceApi};

#[derive(Default)]
struct MockState {
    people: Vec<PersonRef>,
    attendance: Vec<AttendanceRecord>,
    ministries: Vec<Ministry>,
    lookup_delays: HashMap<String, Duration>,
    fail_lookups: bool,
    fail_next_check_in: Option<ApiError>,
    fail_roster: bool,
    /// Consumed one per roster call, in call order
    roster_delays: VecDeque<Duration>,
    lookup_calls: Vec<(String, String)>,
    check_in_calls: usize,
    roster_calls: usize,
}

#[derive(Default)]
pub struct MockAttendanceApi {
    state: Mutex<MockState>,
}

fn name_key(first_name: &str, last_name: &str) -> String {
    format!("{}|{}", first_name.trim().to_lowercase(), last_name.trim().to_lowercase())
}

impl MockAttendanceApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_member(&self, first_name: &str, last_name: &str, email: &str) -> PersonRef {
        let person = PersonRef {
            id: PersonRef::generate_id(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: Some(email.to_string()),
            phone: None,
        };
        self.state.lock().unwrap().people.push(person.clone());
        person
    }

    pub fn add_attendance_record(&self, person: &PersonRef) {
        let record = AttendanceRecord {
            id: AttendanceRecord::generate_id(),
            person_id: person.id.clone(),
            check_in_time: Utc::now(),
            is_first_time_visitor: false,
            ministry_id: None,
            person: Some(person.clone()),
        };
        self.state.lock().unwrap().attendance.push(record);
    }

    pub fn add_ministry(&self, name: &str) {
        self.state.lock().unwrap().ministries.push(Ministry {
            id: Ministry::generate_id(),
            name: name.to_string(),
            description: None,
        });
    }

    pub fn set_lookup_delay(&self, first_name: &str, last_name: &str, delay: Duration) {
        self.state
            .lock()
            .unwrap()
            .lookup_delays
            .insert(name_key(first_name, last_name), delay);
    }

    pub fn fail_lookups(&self, fail: bool) {
        self.state.lock().unwrap().fail_lookups = fail;
    }

    pub fn fail_next_check_in(&self, error: ApiError) {
        self.state.lock().unwrap().fail_next_check_in = Some(error);
    }

    pub fn fail_roster(&self, fail: bool) {
        self.state.lock().unwrap().fail_roster = fail;
    }

    /// Queue a delay; each roster call takes the next queued one
    pub fn push_roster_delay(&self, delay: Duration) {
        self.state.lock().unwrap().roster_delays.push_back(delay);
    }

    pub fn lookup_calls(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().lookup_calls.clone()
    }

    pub fn check_in_calls(&self) -> usize {
        self.state.lock().unwrap().check_in_calls
    }

    pub fn roster_calls(&self) -> usize {
        self.state.lock().unwrap().roster_calls
    }

    pub fn attendance_count(&self) -> usize {
        self.state.lock().unwrap().attendance.len()
    }

    fn find_person(state: &MockState, first_name: &str, last_name: &str) -> Option<PersonRef> {
        let key = name_key(first_name, last_name);
        state
            .people
            .iter()
            .find(|p| name_key(&p.first_name, &p.last_name) == key)
            .cloned()
    }
}

#[async_trait]
impl AttendanceApi for MockAttendanceApi {
    async fn lookup_user(&self, first_name: &str, last_name: &str) -> Result<LookupUserResponse, ApiError> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state
                .lookup_calls
                .push((first_name.to_string(), last_name.to_string()));
            state
                .lookup_delays
                .get(&name_key(first_name, last_name))
                .copied()
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock().unwrap();
        if state.fail_lookups {
            return Err(ApiError::Network("connection refused".to_string()));
        }

        Ok(match Self::find_person(&state, first_name, last_name) {
            Some(person) => {
                let already = state.attendance.iter().any(|a| a.person_id == person.id);
                LookupUserResponse::found(person, already)
            }
            None => LookupUserResponse::not_found(),
        })
    }

    async fn check_in(&self, request: &CheckInRequest) -> Result<CheckInResponse, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.check_in_calls += 1;

        if let Some(error) = state.fail_next_check_in.take() {
            return Err(error);
        }

        let existing = match &request.person_id {
            Some(id) => Some(
                state
                    .people
                    .iter()
                    .find(|p| &p.id == id)
                    .cloned()
                    .ok_or_else(|| ApiError::Rejected {
                        status: 404,
                        message: format!("Person {} not found", id),
                    })?,
            ),
            None => Self::find_person(&state, &request.first_name, &request.last_name),
        };

        let (person, is_new_member) = match existing {
            Some(person) => (person, false),
            None => {
                let email = request
                    .email
                    .clone()
                    .filter(|e| is_valid_email(e))
                    .ok_or_else(|| ApiError::Rejected {
                        status: 400,
                        message: "A valid email is required to register".to_string(),
                    })?;
                let person = PersonRef {
                    id: PersonRef::generate_id(),
                    first_name: request.first_name.clone(),
                    last_name: request.last_name.clone(),
                    email: Some(email),
                    phone: request.phone.clone(),
                };
                state.people.push(person.clone());
                (person, true)
            }
        };

        if state.attendance.iter().any(|a| a.person_id == person.id) {
            return Err(ApiError::DuplicateCheckIn(format!(
                "{} is already checked in today",
                person.full_name()
            )));
        }

        let attendance = AttendanceRecord {
            id: AttendanceRecord::generate_id(),
            person_id: person.id.clone(),
            check_in_time: Utc::now(),
            is_first_time_visitor: is_new_member,
            ministry_id: request.ministry_id.clone(),
            person: Some(person.clone()),
        };
        state.attendance.push(attendance.clone());

        Ok(CheckInResponse {
            success_message: format!("{} checked in", person.full_name()),
            user: person,
            is_new_member,
            attendance,
        })
    }

    async fn get_today_attendance(&self) -> Result<Vec<AttendanceRecord>, ApiError> {
        // The response reflects the data at the time of the call, however late it arrives
        let (snapshot, delay) = {
            let mut state = self.state.lock().unwrap();
            state.roster_calls += 1;
            if state.fail_roster {
                return Err(ApiError::Network("connection reset".to_string()));
            }
            (state.attendance.clone(), state.roster_delays.pop_front())
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(snapshot)
    }

    async fn get_ministries(&self, page: u32, page_size: u32) -> Result<MinistryListResponse, ApiError> {
        let state = self.state.lock().unwrap();
        let data = state
            .ministries
            .iter()
            .skip(page.saturating_sub(1) as usize * page_size as usize)
            .take(page_size as usize)
            .cloned()
            .collect();
        Ok(MinistryListResponse {
            data,
            total: state.ministries.len() as u64,
            page,
            page_size,
        })
    }
}
