//! Domain records and validated write intents.
//!
//! Read models serialize with camelCase keys. Dates of birth travel as
//! `DD/MM/YYYY`, activity dates as `DD/MM/YYYY HH:MM:SS`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DATE_FORMAT: &str = "%d/%m/%Y";
pub const DATE_TIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

pub type PersonId = i64;

/// Phone categories every deployment starts with.
pub const STANDARD_PHONE_TYPES: [&str; 5] = ["mobile", "home", "work", "fax", "other"];

// ── Read models ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    pub first_name: String,
    pub last_name: String,
    #[serde(with = "dmy_date")]
    pub date_of_birth: NaiveDate,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneType {
    pub id: i64,
    pub type_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phone {
    pub id: i64,
    pub person_id: PersonId,
    pub number: String,
    pub phone_type_id: i64,
    pub phone_type: PhoneType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: i64,
    pub person_id: PersonId,
    pub locality: String,
    pub street: String,
    pub number: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A person together with the rows it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonWithRelations {
    #[serde(flatten)]
    pub person: Person,
    pub phones: Vec<Phone>,
    pub addresses: Vec<Address>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Call,
    Meeting,
    Email,
}

impl ActivityType {
    pub const ALL: [ActivityType; 3] = [Self::Call, Self::Meeting, Self::Email];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Meeting => "meeting",
            Self::Email => "email",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "call" => Ok(Self::Call),
            "meeting" => Ok(Self::Meeting),
            "email" => Ok(Self::Email),
            other => Err(format!("unknown activity type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i64,
    pub person_id: PersonId,
    pub activity_type: ActivityType,
    #[serde(with = "dmy_hms")]
    pub activity_date: NaiveDateTime,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonSummary {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(with = "dmy_date")]
    pub date_of_birth: NaiveDate,
}

impl From<&Person> for PersonSummary {
    fn from(p: &Person) -> Self {
        Self {
            first_name: p.first_name.clone(),
            last_name: p.last_name.clone(),
            email: p.email.clone(),
            date_of_birth: p.date_of_birth,
        }
    }
}

/// Activity row as returned by activity search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityWithPerson {
    #[serde(flatten)]
    pub activity: Activity,
    pub person: PersonSummary,
}

// ── Write intents (already validated) ─────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub email: String,
    pub phones: Vec<NewPhone>,
    pub addresses: Vec<NewAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPhone {
    pub number: String,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAddress {
    pub locality: String,
    pub street: String,
    pub number: String,
    pub notes: Option<String>,
}

/// Partial update of a person's own columns. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
}

impl PersonPatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.date_of_birth.is_none()
            && self.email.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub person_id: PersonId,
    pub activity_type: ActivityType,
    pub activity_date: NaiveDateTime,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityQuery {
    pub person_id: PersonId,
    pub activity_type: Option<ActivityType>,
}

// ── serde helpers ─────────────────────────────────────────────

pub mod dmy_date {
    use super::DATE_FORMAT;
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&date.format(DATE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(serde::de::Error::custom)
    }
}

pub mod dmy_hms {
    use super::DATE_TIME_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&at.format(DATE_TIME_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, DATE_TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}
