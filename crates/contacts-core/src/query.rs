//! Query composer: turns [`Criteria`] into a structured predicate plan.
//!
//! Plans carry values, never query text. Each store renders them with its
//! own parameter binding. [`Predicate::matches`] is the reference semantics
//! used by the in-memory store.

use chrono::NaiveDate;

use crate::criteria::{Criteria, FieldFilters};
use crate::types::PersonWithRelations;

/// Text columns of the person table that accept substring terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonColumn {
    FirstName,
    LastName,
    Email,
}

impl PersonColumn {
    pub fn column_name(self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Email => "email",
        }
    }

    fn value(self, p: &PersonWithRelations) -> &str {
        match self {
            Self::FirstName => &p.person.first_name,
            Self::LastName => &p.person.last_name,
            Self::Email => &p.person.email,
        }
    }
}

/// Conditions that must all hold on one and the same phone row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhoneMatch {
    pub number_contains: Option<String>,
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Conjunction. Empty is true.
    All(Vec<Predicate>),
    /// Disjunction. Empty is false.
    Any(Vec<Predicate>),
    /// Case-sensitive substring match.
    Contains(PersonColumn, String),
    /// Exact date of birth.
    BornOn(NaiveDate),
    /// Some owned phone satisfies every condition.
    HasPhone(PhoneMatch),
}

impl Predicate {
    pub fn all() -> Self {
        Self::All(Vec::new())
    }

    pub fn any() -> Self {
        Self::Any(Vec::new())
    }

    /// Fold a term into a conjunction.
    pub fn and(self, term: Predicate) -> Self {
        match self {
            Self::All(mut terms) => {
                terms.push(term);
                Self::All(terms)
            }
            other => Self::All(vec![other, term]),
        }
    }

    /// Fold a term into a disjunction.
    pub fn or(self, term: Predicate) -> Self {
        match self {
            Self::Any(mut terms) => {
                terms.push(term);
                Self::Any(terms)
            }
            other => Self::Any(vec![other, term]),
        }
    }

    /// Fold a term in only when the value is present.
    fn and_some<T>(self, value: Option<T>, term: impl FnOnce(T) -> Predicate) -> Self {
        match value {
            Some(v) => self.and(term(v)),
            None => self,
        }
    }

    pub fn matches(&self, row: &PersonWithRelations) -> bool {
        match self {
            Self::All(terms) => terms.iter().all(|t| t.matches(row)),
            Self::Any(terms) => terms.iter().any(|t| t.matches(row)),
            Self::Contains(col, needle) => col.value(row).contains(needle.as_str()),
            Self::BornOn(date) => row.person.date_of_birth == *date,
            Self::HasPhone(m) => row.phones.iter().any(|phone| {
                m.number_contains
                    .as_deref()
                    .map_or(true, |n| phone.number.contains(n))
                    && m
                        .type_name
                        .as_deref()
                        .map_or(true, |t| phone.phone_type.type_name == t)
            }),
        }
    }
}

/// A composed person search, ready for a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPlan {
    pub predicate: Predicate,
}

pub fn compose(criteria: &Criteria) -> SearchPlan {
    let predicate = match criteria {
        Criteria::FreeText(q) => free_text(q),
        Criteria::Fields(filters) => field_filters(filters),
    };
    SearchPlan { predicate }
}

fn free_text(q: &str) -> Predicate {
    Predicate::any()
        .or(Predicate::Contains(PersonColumn::FirstName, q.to_string()))
        .or(Predicate::Contains(PersonColumn::LastName, q.to_string()))
        .or(Predicate::Contains(PersonColumn::Email, q.to_string()))
        .or(Predicate::HasPhone(PhoneMatch {
            number_contains: Some(q.to_string()),
            type_name: None,
        }))
}

fn field_filters(f: &FieldFilters) -> Predicate {
    let phone = (f.phone.is_some() || f.phone_type.is_some()).then(|| PhoneMatch {
        number_contains: f.phone.clone(),
        type_name: f.phone_type.clone(),
    });

    Predicate::all()
        .and_some(f.first_name.clone(), |v| {
            Predicate::Contains(PersonColumn::FirstName, v)
        })
        .and_some(f.last_name.clone(), |v| {
            Predicate::Contains(PersonColumn::LastName, v)
        })
        .and_some(f.email.clone(), |v| Predicate::Contains(PersonColumn::Email, v))
        .and_some(f.date_of_birth, Predicate::BornOn)
        .and_some(phone, Predicate::HasPhone)
}
