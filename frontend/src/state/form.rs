use shared::{is_valid_email, meets_min_name_length, CheckInRequest};
use std::fmt;

use super::mode::{Mode, NameQuery};

/// Fields typed at the kiosk
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CheckInForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub ministry_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    FirstName,
    LastName,
    Email,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormFieldError {
    FirstNameTooShort(usize),
    LastNameTooShort(usize),
    EmailRequired,
    EmailInvalid,
}

impl FormFieldError {
    pub fn field(&self) -> FormField {
        match self {
            FormFieldError::FirstNameTooShort(_) => FormField::FirstName,
            FormFieldError::LastNameTooShort(_) => FormField::LastName,
            FormFieldError::EmailRequired | FormFieldError::EmailInvalid => FormField::Email,
        }
    }
}

impl fmt::Display for FormFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormFieldError::FirstNameTooShort(min) => {
                write!(f, "First name must be at least {} characters", min)
            }
            FormFieldError::LastNameTooShort(min) => {
                write!(f, "Last name must be at least {} characters", min)
            }
            FormFieldError::EmailRequired => write!(f, "Email is required for new members"),
            FormFieldError::EmailInvalid => write!(f, "Please enter a valid email address"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormValidation {
    pub is_valid: bool,
    pub errors: Vec<FormFieldError>,
}

impl CheckInForm {
    pub fn name_query(&self) -> NameQuery {
        NameQuery::new(self.first_name.clone(), self.last_name.clone())
    }

    /// Field-level validation for the current mode. Email is only required
    /// when registering a new member.
    pub fn validate(&self, mode: &Mode, min_name_length: usize) -> FormValidation {
        let mut errors = Vec::new();

        if !meets_min_name_length(&self.first_name, min_name_length) {
            errors.push(FormFieldError::FirstNameTooShort(min_name_length));
        }
        if !meets_min_name_length(&self.last_name, min_name_length) {
            errors.push(FormFieldError::LastNameTooShort(min_name_length));
        }

        let email = self.email.trim();
        if email.is_empty() {
            if matches!(mode, Mode::NewMember) {
                errors.push(FormFieldError::EmailRequired);
            }
        } else if !is_valid_email(email) {
            errors.push(FormFieldError::EmailInvalid);
        }

        FormValidation {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// Build the submission for `mode`, or `None` when the mode has no check-in path
    pub fn to_request(&self, mode: &Mode) -> Option<CheckInRequest> {
        let email = non_empty(&self.email);
        let phone = non_empty(&self.phone);

        match mode {
            Mode::QuickCheckIn(person) => Some(CheckInRequest {
                first_name: person.first_name.clone(),
                last_name: person.last_name.clone(),
                email: email.or_else(|| person.email.clone()),
                phone: phone.or_else(|| person.phone.clone()),
                ministry_id: self.ministry_id.clone(),
                person_id: Some(person.id.clone()),
            }),
            Mode::NewMember => Some(CheckInRequest {
                first_name: self.first_name.trim().to_string(),
                last_name: self.last_name.trim().to_string(),
                email,
                phone,
                ministry_id: self.ministry_id.clone(),
                person_id: None,
            }),
            Mode::Search(_) => None,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::mode::SearchStatus;
    use shared::PersonRef;

    fn form(first: &str, last: &str, email: &str) -> CheckInForm {
        CheckInForm {
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: email.to_string(),
            ..Default::default()
        }
    }

    fn jane() -> PersonRef {
        PersonRef {
            id: "person::jane".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: Some("jane@example.com".to_string()),
            phone: Some("555-0100".to_string()),
        }
    }

    #[test]
    fn test_new_member_requires_email() {
        let validation = form("Sam", "Lee", "").validate(&Mode::NewMember, 2);
        assert!(!validation.is_valid);
        assert_eq!(validation.errors, vec![FormFieldError::EmailRequired]);

        let ok = form("Sam", "Lee", "sam@example.com").validate(&Mode::NewMember, 2);
        assert!(ok.is_valid);
    }

    #[test]
    fn test_quick_check_in_email_optional_but_checked() {
        let mode = Mode::QuickCheckIn(jane());
        assert!(form("Jane", "Doe", "").validate(&mode, 2).is_valid);

        let bad = form("Jane", "Doe", "not-an-email").validate(&mode, 2);
        assert_eq!(bad.errors, vec![FormFieldError::EmailInvalid]);
        assert_eq!(bad.errors[0].field(), FormField::Email);
    }

    #[test]
    fn test_short_names_reported_per_field() {
        let validation = form("J", " ", "").validate(&Mode::Search(SearchStatus::Idle), 2);
        assert_eq!(
            validation.errors,
            vec![FormFieldError::FirstNameTooShort(2), FormFieldError::LastNameTooShort(2)]
        );
        assert_eq!(validation.errors[0].to_string(), "First name must be at least 2 characters");
    }

    #[test]
    fn test_quick_request_carries_person_and_fallbacks() {
        let mut entry = form("jane", "doe", "");
        entry.ministry_id = Some("ministry::choir".to_string());

        let request = entry.to_request(&Mode::QuickCheckIn(jane())).unwrap();
        assert_eq!(request.person_id.as_deref(), Some("person::jane"));
        assert_eq!(request.first_name, "Jane");
        assert_eq!(request.email.as_deref(), Some("jane@example.com"));
        assert_eq!(request.phone.as_deref(), Some("555-0100"));
        assert_eq!(request.ministry_id.as_deref(), Some("ministry::choir"));
    }

    #[test]
    fn test_new_member_request_trims_fields() {
        let entry = CheckInForm {
            first_name: " Sam ".to_string(),
            last_name: "Lee".to_string(),
            email: " sam@example.com ".to_string(),
            phone: "  ".to_string(),
            ministry_id: None,
        };

        let request = entry.to_request(&Mode::NewMember).unwrap();
        assert_eq!(request.first_name, "Sam");
        assert_eq!(request.email.as_deref(), Some("sam@example.com"));
        assert_eq!(request.phone, None);
        assert_eq!(request.person_id, None);
    }

    #[test]
    fn test_search_mode_has_no_request() {
        let entry = form("Jane", "Doe", "jane@example.com");
        assert!(entry.to_request(&Mode::Search(SearchStatus::Idle)).is_none());
        assert!(entry
            .to_request(&Mode::Search(SearchStatus::AlreadyCheckedIn(jane())))
            .is_none());
    }

    #[test]
    fn test_clear_resets_every_field() {
        let mut entry = form("Jane", "Doe", "jane@example.com");
        entry.phone = "555".to_string();
        entry.ministry_id = Some("m".to_string());
        entry.clear();
        assert_eq!(entry, CheckInForm::default());
    }
}
