//! In-process [`ContactStore`] behind a single `RwLock`.
//!
//! Every write validates under the write lock before touching any table, so
//! a failed composite insert leaves nothing behind.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{ContactError, Result};
use crate::ports::ContactStore;
use crate::query::SearchPlan;
use crate::types::{
    Activity, ActivityQuery, ActivityWithPerson, Address, NewActivity, NewPerson, Person,
    PersonId, PersonPatch, PersonSummary, PersonWithRelations, Phone, PhoneType,
    STANDARD_PHONE_TYPES,
};

#[derive(Debug, Clone)]
struct PhoneRow {
    id: i64,
    person_id: PersonId,
    number: String,
    phone_type_id: i64,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    last_id: i64,
    persons: BTreeMap<PersonId, Person>,
    phones: BTreeMap<i64, PhoneRow>,
    addresses: BTreeMap<i64, Address>,
    activities: BTreeMap<i64, Activity>,
    phone_types: BTreeMap<i64, PhoneType>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn phone_type_named(&self, name: &str) -> Option<&PhoneType> {
        self.phone_types.values().find(|t| t.type_name == name)
    }

    fn email_taken(&self, email: &str, except: Option<PersonId>) -> bool {
        self.persons
            .values()
            .any(|p| p.email == email && Some(p.id) != except)
    }

    fn with_relations(&self, person: &Person) -> PersonWithRelations {
        let phones = self
            .phones
            .values()
            .filter(|ph| ph.person_id == person.id)
            .filter_map(|ph| {
                let phone_type = self.phone_types.get(&ph.phone_type_id)?.clone();
                Some(Phone {
                    id: ph.id,
                    person_id: ph.person_id,
                    number: ph.number.clone(),
                    phone_type_id: ph.phone_type_id,
                    phone_type,
                    created_at: ph.created_at,
                    updated_at: ph.updated_at,
                })
            })
            .collect();
        let addresses = self
            .addresses
            .values()
            .filter(|a| a.person_id == person.id)
            .cloned()
            .collect();
        PersonWithRelations {
            person: person.clone(),
            phones,
            addresses,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the standard phone types.
    pub fn seeded() -> Self {
        let mut tables = Tables::default();
        let now = Utc::now();
        for name in STANDARD_PHONE_TYPES {
            let id = tables.next_id();
            tables.phone_types.insert(
                id,
                PhoneType {
                    id,
                    type_name: name.to_string(),
                    created_at: now,
                    updated_at: now,
                },
            );
        }
        Self {
            tables: RwLock::new(tables),
        }
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn find_person(&self, id: PersonId) -> Result<Option<PersonWithRelations>> {
        let t = self.tables.read().await;
        Ok(t.persons.get(&id).map(|p| t.with_relations(p)))
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self.tables.read().await.email_taken(email, None))
    }

    async fn insert_person(&self, new: NewPerson) -> Result<PersonWithRelations> {
        let mut t = self.tables.write().await;

        if t.email_taken(&new.email, None) {
            return Err(ContactError::Conflict(format!(
                "email {} already exists",
                new.email
            )));
        }
        let mut type_ids = Vec::with_capacity(new.phones.len());
        for phone in &new.phones {
            match t.phone_type_named(&phone.type_name) {
                Some(pt) => type_ids.push(pt.id),
                None => {
                    return Err(ContactError::ForeignKey(format!(
                        "phone type '{}' does not exist",
                        phone.type_name
                    )))
                }
            }
        }

        let now = Utc::now();
        let person_id = t.next_id();
        let person = Person {
            id: person_id,
            first_name: new.first_name,
            last_name: new.last_name,
            date_of_birth: new.date_of_birth,
            email: new.email,
            created_at: now,
            updated_at: now,
        };
        t.persons.insert(person_id, person.clone());

        for (phone, phone_type_id) in new.phones.into_iter().zip(type_ids) {
            let id = t.next_id();
            t.phones.insert(
                id,
                PhoneRow {
                    id,
                    person_id,
                    number: phone.number,
                    phone_type_id,
                    created_at: now,
                    updated_at: now,
                },
            );
        }
        for address in new.addresses {
            let id = t.next_id();
            t.addresses.insert(
                id,
                Address {
                    id,
                    person_id,
                    locality: address.locality,
                    street: address.street,
                    number: address.number,
                    notes: address.notes,
                    created_at: now,
                    updated_at: now,
                },
            );
        }

        Ok(t.with_relations(&person))
    }

    async fn update_person(
        &self,
        id: PersonId,
        patch: PersonPatch,
    ) -> Result<PersonWithRelations> {
        let mut t = self.tables.write().await;

        if let Some(email) = &patch.email {
            if t.email_taken(email, Some(id)) {
                return Err(ContactError::Conflict(format!(
                    "Email {email} already exists"
                )));
            }
        }
        let Some(person) = t.persons.get_mut(&id) else {
            return Err(ContactError::NotFound(format!("Person {id} not found")));
        };
        if let Some(v) = patch.first_name {
            person.first_name = v;
        }
        if let Some(v) = patch.last_name {
            person.last_name = v;
        }
        if let Some(v) = patch.date_of_birth {
            person.date_of_birth = v;
        }
        if let Some(v) = patch.email {
            person.email = v;
        }
        person.updated_at = Utc::now();

        let person = person.clone();
        Ok(t.with_relations(&person))
    }

    async fn delete_person(&self, id: PersonId) -> Result<bool> {
        let mut t = self.tables.write().await;
        if t.persons.remove(&id).is_none() {
            return Ok(false);
        }
        t.phones.retain(|_, ph| ph.person_id != id);
        t.addresses.retain(|_, a| a.person_id != id);
        t.activities.retain(|_, a| a.person_id != id);
        Ok(true)
    }

    async fn search_persons(&self, plan: &SearchPlan) -> Result<Vec<PersonWithRelations>> {
        let t = self.tables.read().await;
        Ok(t.persons
            .values()
            .map(|p| t.with_relations(p))
            .filter(|row| plan.predicate.matches(row))
            .collect())
    }

    async fn insert_activity(&self, new: NewActivity) -> Result<Activity> {
        let mut t = self.tables.write().await;
        if !t.persons.contains_key(&new.person_id) {
            return Err(ContactError::ForeignKey(format!(
                "person {} does not exist",
                new.person_id
            )));
        }
        let now = Utc::now();
        let id = t.next_id();
        let activity = Activity {
            id,
            person_id: new.person_id,
            activity_type: new.activity_type,
            activity_date: new.activity_date,
            description: new.description,
            created_at: now,
            updated_at: now,
        };
        t.activities.insert(id, activity.clone());
        Ok(activity)
    }

    async fn find_activities(&self, query: &ActivityQuery) -> Result<Vec<ActivityWithPerson>> {
        let t = self.tables.read().await;
        let Some(person) = t.persons.get(&query.person_id) else {
            return Ok(Vec::new());
        };
        let summary = PersonSummary::from(person);
        let mut rows: Vec<ActivityWithPerson> = t
            .activities
            .values()
            .filter(|a| a.person_id == query.person_id)
            .filter(|a| query.activity_type.map_or(true, |ty| a.activity_type == ty))
            .map(|a| ActivityWithPerson {
                activity: a.clone(),
                person: summary.clone(),
            })
            .collect();
        rows.sort_by(|a, b| {
            b.activity
                .activity_date
                .cmp(&a.activity.activity_date)
                .then(b.activity.id.cmp(&a.activity.id))
        });
        Ok(rows)
    }

    async fn list_phone_types(&self) -> Result<Vec<PhoneType>> {
        let t = self.tables.read().await;
        let mut types: Vec<PhoneType> = t.phone_types.values().cloned().collect();
        types.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        Ok(types)
    }

    async fn insert_phone_type(&self, type_name: &str) -> Result<PhoneType> {
        let mut t = self.tables.write().await;
        if t.phone_type_named(type_name).is_some() {
            return Err(ContactError::Conflict(format!(
                "phone type '{type_name}' already exists"
            )));
        }
        let now = Utc::now();
        let id = t.next_id();
        let phone_type = PhoneType {
            id,
            type_name: type_name.to_string(),
            created_at: now,
            updated_at: now,
        };
        t.phone_types.insert(id, phone_type.clone());
        Ok(phone_type)
    }

    async fn delete_phone_type(&self, id: i64) -> Result<bool> {
        let mut t = self.tables.write().await;
        if !t.phone_types.contains_key(&id) {
            return Ok(false);
        }
        let in_use = t.phones.values().filter(|ph| ph.phone_type_id == id).count();
        if in_use > 0 {
            return Err(ContactError::Conflict(format!(
                "phone type {id} is still referenced by {in_use} phone(s)"
            )));
        }
        t.phone_types.remove(&id);
        Ok(true)
    }
}
