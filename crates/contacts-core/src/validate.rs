//! Request payloads and their validation into write intents.
//!
//! Every payload field is optional at the serde level so that missing
//! fields are reported together with field-level detail.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Deserialize;

use crate::error::{ContactError, FieldError, Result};
use crate::types::{
    ActivityQuery, ActivityType, NewActivity, NewAddress, NewPerson, NewPhone, PersonPatch,
    DATE_FORMAT, DATE_TIME_FORMAT,
};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").unwrap());
static DATE_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4} \d{2}:\d{2}:\d{2}$").unwrap());

/// Parse a canonical `DD/MM/YYYY` birth date.
pub fn parse_birth_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    if !DATE_RE.is_match(raw) {
        return Err("Date of birth must be in format DD/MM/YYYY".into());
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| "Date of birth is not a valid calendar date".into())
}

/// Parse a canonical `DD/MM/YYYY HH:MM:SS` activity date.
pub fn parse_activity_date(raw: &str) -> std::result::Result<NaiveDateTime, String> {
    if !DATE_TIME_RE.is_match(raw) {
        return Err("Activity date must be in format DD/MM/YYYY HH:MM:SS".into());
    }
    NaiveDateTime::parse_from_str(raw, DATE_TIME_FORMAT)
        .map_err(|_| "Activity date is not a valid date and time".into())
}

// ── Payloads ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePersonRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub email: Option<String>,
    pub phones: Option<Vec<PhoneRequest>>,
    pub addresses: Option<Vec<AddressRequest>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneRequest {
    pub number: Option<String>,
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRequest {
    pub locality: Option<String>,
    pub street: Option<String>,
    pub number: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePersonRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivityRequest {
    pub person_id: Option<i64>,
    pub activity_type: Option<String>,
    pub activity_date: Option<String>,
    pub description: Option<String>,
}

/// Query string of `GET /activities/search`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySearchParams {
    pub person_id: Option<String>,
    pub activity_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePhoneTypeRequest {
    pub type_name: Option<String>,
}

// ── Validation ────────────────────────────────────────────────

#[derive(Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    fn required(&mut self, field: &str, value: Option<String>, message: &str) -> String {
        match value {
            Some(v) if !v.is_empty() => v,
            _ => {
                self.fail(field, message);
                String::new()
            }
        }
    }

    /// A supplied value must not be empty; absence is fine.
    fn non_empty(&mut self, field: &str, value: Option<String>, message: &str) -> Option<String> {
        match value {
            Some(v) if v.is_empty() => {
                self.fail(field, message);
                None
            }
            other => other,
        }
    }

    fn email(&mut self, field: &str, value: &str) {
        if !value.is_empty() && !EMAIL_RE.is_match(value) {
            self.fail(field, "Invalid email format");
        }
    }

    fn birth_date(&mut self, field: &str, raw: &str) -> Option<NaiveDate> {
        if raw.is_empty() {
            return None;
        }
        parse_birth_date(raw)
            .map_err(|message| self.fail(field, message))
            .ok()
    }

    fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ContactError::Validation(self.errors))
        }
    }
}

impl CreatePersonRequest {
    pub fn validate(self) -> Result<NewPerson> {
        let mut c = Checker::default();

        let first_name = c.required("firstName", self.first_name, "First name is required");
        let last_name = c.required("lastName", self.last_name, "Last name is required");
        let raw_dob = c.required(
            "dateOfBirth",
            self.date_of_birth,
            "Date of birth is required",
        );
        let date_of_birth = c.birth_date("dateOfBirth", &raw_dob);
        let email = c.required("email", self.email, "Invalid email format");
        c.email("email", &email);

        let phones = self
            .phones
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, p)| NewPhone {
                number: c.required(
                    &format!("phones.{i}.number"),
                    p.number,
                    "Phone number is required",
                ),
                type_name: c.required(
                    &format!("phones.{i}.typeName"),
                    p.type_name,
                    "Phone type is required",
                ),
            })
            .collect();

        let addresses = self
            .addresses
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, a)| NewAddress {
                locality: c.required(
                    &format!("addresses.{i}.locality"),
                    a.locality,
                    "Locality is required",
                ),
                street: c.required(
                    &format!("addresses.{i}.street"),
                    a.street,
                    "Street is required",
                ),
                number: c.required(
                    &format!("addresses.{i}.number"),
                    a.number,
                    "Street number is required",
                ),
                notes: a.notes,
            })
            .collect();

        c.finish()?;
        Ok(NewPerson {
            first_name,
            last_name,
            date_of_birth: date_of_birth.unwrap_or_default(),
            email,
            phones,
            addresses,
        })
    }
}

impl UpdatePersonRequest {
    pub fn validate(self) -> Result<PersonPatch> {
        let mut c = Checker::default();

        let first_name = c.non_empty("firstName", self.first_name, "First name cannot be empty");
        let last_name = c.non_empty("lastName", self.last_name, "Last name cannot be empty");
        let date_of_birth = match self.date_of_birth {
            Some(raw) if raw.is_empty() => {
                c.fail("dateOfBirth", "Date of birth must be in format DD/MM/YYYY");
                None
            }
            Some(raw) => c.birth_date("dateOfBirth", &raw),
            None => None,
        };
        let email = c.non_empty("email", self.email, "Invalid email format");
        if let Some(email) = &email {
            c.email("email", email);
        }

        c.finish()?;
        Ok(PersonPatch {
            first_name,
            last_name,
            date_of_birth,
            email,
        })
    }
}

impl CreateActivityRequest {
    pub fn validate(self) -> Result<NewActivity> {
        let mut c = Checker::default();

        let person_id = match self.person_id {
            Some(id) if id > 0 => id,
            _ => {
                c.fail("personId", "Person ID must be a positive integer");
                0
            }
        };
        let activity_type = match self.activity_type.as_deref().map(str::parse::<ActivityType>) {
            Some(Ok(t)) => Some(t),
            _ => {
                c.fail(
                    "activityType",
                    "Activity type must be 'call', 'meeting', or 'email'",
                );
                None
            }
        };
        let raw_date = c.required(
            "activityDate",
            self.activity_date,
            "Activity date is required",
        );
        let activity_date = if raw_date.is_empty() {
            None
        } else {
            parse_activity_date(&raw_date)
                .map_err(|message| c.fail("activityDate", message))
                .ok()
        };

        c.finish()?;
        Ok(NewActivity {
            person_id,
            activity_type: activity_type.unwrap_or(ActivityType::Call),
            activity_date: activity_date.unwrap_or_default(),
            description: self.description,
        })
    }
}

impl ActivitySearchParams {
    pub fn validate(self) -> Result<ActivityQuery> {
        let mut c = Checker::default();

        let person_id = match self.person_id.as_deref().map(str::parse::<i64>) {
            Some(Ok(id)) if id > 0 => id,
            _ => {
                c.fail("personId", "Person ID must be a positive integer");
                0
            }
        };
        let activity_type = match self.activity_type.as_deref() {
            None | Some("") => None,
            Some(raw) => match raw.parse::<ActivityType>() {
                Ok(t) => Some(t),
                Err(_) => {
                    c.fail(
                        "activityType",
                        "Activity type must be 'call', 'meeting', or 'email'",
                    );
                    None
                }
            },
        };

        c.finish()?;
        Ok(ActivityQuery {
            person_id,
            activity_type,
        })
    }
}

impl CreatePhoneTypeRequest {
    pub fn validate(self) -> Result<String> {
        match self.type_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(name.to_string()),
            _ => Err(ContactError::invalid(
                "typeName",
                "Phone type name is required",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn juan() -> CreatePersonRequest {
        CreatePersonRequest {
            first_name: Some("Juan".into()),
            last_name: Some("Pérez".into()),
            date_of_birth: Some("15/03/1990".into()),
            email: Some("juan@example.com".into()),
            phones: Some(vec![PhoneRequest {
                number: Some("+34 600 111 222".into()),
                type_name: Some("mobile".into()),
            }]),
            addresses: None,
        }
    }

    fn fields(err: ContactError) -> Vec<String> {
        match err {
            ContactError::Validation(f) => f.into_iter().map(|f| f.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_person_passes() {
        let p = juan().validate().unwrap();
        assert_eq!(p.date_of_birth, NaiveDate::from_ymd_opt(1990, 3, 15).unwrap());
        assert_eq!(p.phones.len(), 1);
        assert!(p.addresses.is_empty());
    }

    #[test]
    fn missing_fields_reported_together() {
        let err = CreatePersonRequest::default().validate().unwrap_err();
        assert_eq!(
            fields(err),
            vec!["firstName", "lastName", "dateOfBirth", "email"]
        );
    }

    #[test]
    fn nested_phone_and_address_fields_are_indexed() {
        let mut req = juan();
        req.phones = Some(vec![
            PhoneRequest {
                number: Some("1".into()),
                type_name: Some("home".into()),
            },
            PhoneRequest {
                number: None,
                type_name: Some("work".into()),
            },
        ]);
        req.addresses = Some(vec![AddressRequest {
            locality: Some("Madrid".into()),
            street: None,
            number: Some("3".into()),
            notes: None,
        }]);
        let err = req.validate().unwrap_err();
        assert_eq!(fields(err), vec!["phones.1.number", "addresses.0.street"]);
    }

    #[test]
    fn bad_email_and_date_rejected() {
        let mut req = juan();
        req.email = Some("juan.example.com".into());
        req.date_of_birth = Some("1990-03-15".into());
        let err = req.validate().unwrap_err();
        assert_eq!(fields(err), vec!["dateOfBirth", "email"]);
    }

    #[test]
    fn impossible_calendar_date_rejected() {
        assert!(parse_birth_date("31/02/1990").is_err());
        assert!(parse_birth_date("1/3/1990").is_err());
        assert!(parse_birth_date("01/03/1990").is_ok());
    }

    #[test]
    fn update_accepts_partial_and_rejects_empty_strings() {
        let patch = UpdatePersonRequest {
            last_name: Some("Gómez".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(patch.last_name.as_deref(), Some("Gómez"));
        assert!(patch.first_name.is_none());

        let err = UpdatePersonRequest {
            first_name: Some(String::new()),
            email: Some("nope".into()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(fields(err), vec!["firstName", "email"]);
    }

    #[test]
    fn activity_request_validated() {
        let a = CreateActivityRequest {
            person_id: Some(4),
            activity_type: Some("meeting".into()),
            activity_date: Some("01/02/2024 10:30:00".into()),
            description: Some("Quarterly review".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(a.activity_type, ActivityType::Meeting);

        let err = CreateActivityRequest {
            person_id: Some(0),
            activity_type: Some("visit".into()),
            activity_date: Some("01/02/2024".into()),
            description: None,
        }
        .validate()
        .unwrap_err();
        assert_eq!(fields(err), vec!["personId", "activityType", "activityDate"]);
    }

    #[test]
    fn activity_search_params_parsed() {
        let q = ActivitySearchParams {
            person_id: Some("999".into()),
            activity_type: None,
        }
        .validate()
        .unwrap();
        assert_eq!(q.person_id, 999);
        assert!(q.activity_type.is_none());

        let err = ActivitySearchParams {
            person_id: Some("abc".into()),
            activity_type: Some("email".into()),
        }
        .validate()
        .unwrap_err();
        assert_eq!(fields(err), vec!["personId"]);
    }

    #[test]
    fn phone_type_name_trimmed() {
        let name = CreatePhoneTypeRequest {
            type_name: Some("  pager ".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(name, "pager");
        assert!(CreatePhoneTypeRequest {
            type_name: Some("   ".into())
        }
        .validate()
        .is_err());
    }
}
