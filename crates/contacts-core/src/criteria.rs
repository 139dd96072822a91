//! Person search criteria.
//!
//! Raw query parameters are normalized exactly once into [`Criteria`]. A
//! free-text token and field filters never coexist in a normalized value.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{ContactError, FieldError, Result};
use crate::validate::parse_birth_date;

/// Query string of `GET /persons/search` as received.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonSearchParams {
    pub q: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub phone: Option<String>,
    pub phone_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criteria {
    /// Matches first name, last name, email or any phone number.
    FreeText(String),
    /// Conjunction of the supplied filters. Never empty.
    Fields(FieldFilters),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldFilters {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub phone: Option<String>,
    pub phone_type: Option<String>,
}

impl FieldFilters {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.date_of_birth.is_none()
            && self.phone.is_none()
            && self.phone_type.is_none()
    }
}

impl Criteria {
    /// Normalize raw parameters. Empty strings count as absent.
    ///
    /// A supplied `dateOfBirth` must be well-formed even when `q` takes over.
    pub fn from_params(params: PersonSearchParams) -> Result<Self> {
        let date_of_birth = match present(params.date_of_birth) {
            Some(raw) => Some(parse_birth_date(&raw).map_err(|message| {
                ContactError::Validation(vec![FieldError::new("dateOfBirth", message)])
            })?),
            None => None,
        };

        if let Some(q) = present(params.q) {
            return Ok(Self::FreeText(q));
        }

        let filters = FieldFilters {
            first_name: present(params.first_name),
            last_name: present(params.last_name),
            email: present(params.email),
            date_of_birth,
            phone: present(params.phone),
            phone_type: present(params.phone_type),
        };

        if filters.is_empty() {
            return Err(ContactError::invalid(
                "",
                "At least one search parameter is required",
            ));
        }
        Ok(Self::Fields(filters))
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
