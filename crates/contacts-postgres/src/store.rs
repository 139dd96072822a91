//! Postgres implementation of [`ContactStore`].
//!
//! All SQL is runtime-checked (sqlx::query, not sqlx::query!) to avoid a
//! compile-time database requirement.

use std::collections::HashMap;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::debug;

use contacts_core::error::{ContactError, Result};
use contacts_core::ports::ContactStore;
use contacts_core::query::SearchPlan;
use contacts_core::types::{
    Activity, ActivityQuery, ActivityType, ActivityWithPerson, Address, NewActivity, NewPerson,
    Person, PersonId, PersonPatch, PersonSummary, PersonWithRelations, Phone, PhoneType,
};

use crate::search::{person_search_query, PERSON_COLUMNS};

// ── Row types ─────────────────────────────────────────────────

#[derive(Debug, FromRow)]
struct PgPersonRow {
    id: i64,
    first_name: String,
    last_name: String,
    date_of_birth: NaiveDate,
    email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PgPersonRow> for Person {
    fn from(r: PgPersonRow) -> Self {
        Self {
            id: r.id,
            first_name: r.first_name,
            last_name: r.last_name,
            date_of_birth: r.date_of_birth,
            email: r.email,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PgPhoneTypeRow {
    id: i64,
    type_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PgPhoneTypeRow> for PhoneType {
    fn from(r: PgPhoneTypeRow) -> Self {
        Self {
            id: r.id,
            type_name: r.type_name,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PgPhoneRow {
    id: i64,
    person_id: i64,
    number: String,
    phone_type_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    type_name: String,
    type_created_at: DateTime<Utc>,
    type_updated_at: DateTime<Utc>,
}

impl From<PgPhoneRow> for Phone {
    fn from(r: PgPhoneRow) -> Self {
        Self {
            id: r.id,
            person_id: r.person_id,
            number: r.number,
            phone_type_id: r.phone_type_id,
            phone_type: PhoneType {
                id: r.phone_type_id,
                type_name: r.type_name,
                created_at: r.type_created_at,
                updated_at: r.type_updated_at,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PgAddressRow {
    id: i64,
    person_id: i64,
    locality: String,
    street: String,
    number: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PgAddressRow> for Address {
    fn from(r: PgAddressRow) -> Self {
        Self {
            id: r.id,
            person_id: r.person_id,
            locality: r.locality,
            street: r.street,
            number: r.number,
            notes: r.notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PgActivityRow {
    id: i64,
    person_id: i64,
    activity_type: String,
    activity_date: NaiveDateTime,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PgActivityRow> for Activity {
    type Error = String;

    fn try_from(r: PgActivityRow) -> std::result::Result<Self, String> {
        Ok(Self {
            id: r.id,
            person_id: r.person_id,
            activity_type: r.activity_type.parse::<ActivityType>()?,
            activity_date: r.activity_date,
            description: r.description,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PgActivityWithPersonRow {
    #[sqlx(flatten)]
    activity: PgActivityRow,
    first_name: String,
    last_name: String,
    email: String,
    date_of_birth: NaiveDate,
}

const ACTIVITY_COLUMNS: &str =
    "id, person_id, activity_type, activity_date, description, created_at, updated_at";

// ── Error mapping ─────────────────────────────────────────────

fn db_error(e: sqlx::Error) -> ContactError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return ContactError::Conflict(match db.constraint() {
                Some(c) => format!("A record with this value already exists ({c})"),
                None => "A record with this value already exists".into(),
            });
        }
        if db.is_foreign_key_violation() {
            return ContactError::ForeignKey("Foreign key constraint failed".into());
        }
    }
    ContactError::Internal(anyhow!(e))
}

fn row_error(e: String) -> ContactError {
    ContactError::Internal(anyhow!(e))
}

// ── PgContactStore ────────────────────────────────────────────

/// Postgres-backed contact store.
#[derive(Clone)]
pub struct PgContactStore {
    pool: PgPool,
}

impl PgContactStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Load phones and addresses for a batch of persons, keeping their order.
    async fn attach_relations(
        conn: &mut PgConnection,
        persons: Vec<Person>,
    ) -> Result<Vec<PersonWithRelations>> {
        if persons.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = persons.iter().map(|p| p.id).collect();

        let phones = sqlx::query_as::<_, PgPhoneRow>(
            r#"
            SELECT ph.id, ph.person_id, ph.number, ph.phone_type_id,
                   ph.created_at, ph.updated_at,
                   pt.type_name, pt.created_at AS type_created_at,
                   pt.updated_at AS type_updated_at
            FROM phone ph
            JOIN phone_type pt ON pt.id = ph.phone_type_id
            WHERE ph.person_id = ANY($1)
            ORDER BY ph.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error)?;

        let addresses = sqlx::query_as::<_, PgAddressRow>(
            r#"
            SELECT id, person_id, locality, street, number, notes, created_at, updated_at
            FROM address
            WHERE person_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error)?;

        let mut phones_by_person: HashMap<i64, Vec<Phone>> = HashMap::new();
        for row in phones {
            phones_by_person
                .entry(row.person_id)
                .or_default()
                .push(row.into());
        }
        let mut addresses_by_person: HashMap<i64, Vec<Address>> = HashMap::new();
        for row in addresses {
            addresses_by_person
                .entry(row.person_id)
                .or_default()
                .push(row.into());
        }

        Ok(persons
            .into_iter()
            .map(|person| PersonWithRelations {
                phones: phones_by_person.remove(&person.id).unwrap_or_default(),
                addresses: addresses_by_person.remove(&person.id).unwrap_or_default(),
                person,
            })
            .collect())
    }

    async fn load_one(conn: &mut PgConnection, person: Person) -> Result<PersonWithRelations> {
        Self::attach_relations(conn, vec![person])
            .await?
            .pop()
            .ok_or_else(|| ContactError::Internal(anyhow!("person vanished while loading")))
    }
}

#[async_trait]
impl ContactStore for PgContactStore {
    async fn find_person(&self, id: PersonId) -> Result<Option<PersonWithRelations>> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        let row = sqlx::query_as::<_, PgPersonRow>(&format!(
            "SELECT {PERSON_COLUMNS} FROM person p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error)?;

        match row {
            Some(row) => Ok(Some(Self::load_one(&mut conn, row.into()).await?)),
            None => Ok(None),
        }
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM person WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await
                .map_err(db_error)?;
        Ok(exists)
    }

    async fn insert_person(&self, new: NewPerson) -> Result<PersonWithRelations> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Resolve phone types up front so an unknown name writes nothing.
        let mut names: Vec<String> = new.phones.iter().map(|p| p.type_name.clone()).collect();
        names.sort();
        names.dedup();
        let type_ids: HashMap<String, i64> = if names.is_empty() {
            HashMap::new()
        } else {
            sqlx::query_as::<_, (String, i64)>(
                "SELECT type_name, id FROM phone_type WHERE type_name = ANY($1)",
            )
            .bind(&names)
            .fetch_all(&mut *tx)
            .await
            .map_err(db_error)?
            .into_iter()
            .collect()
        };
        if let Some(missing) = names.iter().find(|n| !type_ids.contains_key(*n)) {
            return Err(ContactError::ForeignKey(format!(
                "phone type '{missing}' does not exist"
            )));
        }

        let person: Person = sqlx::query_as::<_, PgPersonRow>(
            r#"
            INSERT INTO person (first_name, last_name, date_of_birth, email)
            VALUES ($1, $2, $3, $4)
            RETURNING id, first_name, last_name, date_of_birth, email, created_at, updated_at
            "#,
        )
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(new.date_of_birth)
        .bind(&new.email)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?
        .into();

        for phone in &new.phones {
            sqlx::query("INSERT INTO phone (person_id, phone_type_id, number) VALUES ($1, $2, $3)")
                .bind(person.id)
                .bind(type_ids[&phone.type_name])
                .bind(&phone.number)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }
        for address in &new.addresses {
            sqlx::query(
                r#"
                INSERT INTO address (person_id, locality, street, number, notes)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(person.id)
            .bind(&address.locality)
            .bind(&address.street)
            .bind(&address.number)
            .bind(&address.notes)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        let created = Self::load_one(&mut tx, person).await?;
        tx.commit().await.map_err(db_error)?;
        Ok(created)
    }

    async fn update_person(
        &self,
        id: PersonId,
        patch: PersonPatch,
    ) -> Result<PersonWithRelations> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        let row = sqlx::query_as::<_, PgPersonRow>(
            r#"
            UPDATE person
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                date_of_birth = COALESCE($4, date_of_birth),
                email = COALESCE($5, email),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, first_name, last_name, date_of_birth, email, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(patch.first_name)
        .bind(patch.last_name)
        .bind(patch.date_of_birth)
        .bind(patch.email)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| ContactError::NotFound(format!("Person {id} not found")))?;

        Self::load_one(&mut conn, row.into()).await
    }

    async fn delete_person(&self, id: PersonId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM person WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn search_persons(&self, plan: &SearchPlan) -> Result<Vec<PersonWithRelations>> {
        let mut qb = person_search_query(&plan.predicate);
        debug!(sql = qb.sql(), "Person search");

        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        let persons: Vec<Person> = qb
            .build_query_as::<PgPersonRow>()
            .fetch_all(&mut *conn)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(Into::into)
            .collect();

        Self::attach_relations(&mut conn, persons).await
    }

    async fn insert_activity(&self, new: NewActivity) -> Result<Activity> {
        let row = sqlx::query_as::<_, PgActivityRow>(&format!(
            r#"
            INSERT INTO activity (person_id, activity_type, activity_date, description)
            VALUES ($1, $2, $3, $4)
            RETURNING {ACTIVITY_COLUMNS}
            "#
        ))
        .bind(new.person_id)
        .bind(new.activity_type.as_str())
        .bind(new.activity_date)
        .bind(&new.description)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        row.try_into().map_err(row_error)
    }

    async fn find_activities(&self, query: &ActivityQuery) -> Result<Vec<ActivityWithPerson>> {
        let rows = sqlx::query_as::<_, PgActivityWithPersonRow>(
            r#"
            SELECT a.id, a.person_id, a.activity_type, a.activity_date, a.description,
                   a.created_at, a.updated_at,
                   p.first_name, p.last_name, p.email, p.date_of_birth
            FROM activity a
            JOIN person p ON p.id = a.person_id
            WHERE a.person_id = $1
              AND ($2::text IS NULL OR a.activity_type = $2)
            ORDER BY a.activity_date DESC, a.id DESC
            "#,
        )
        .bind(query.person_id)
        .bind(query.activity_type.map(ActivityType::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter()
            .map(|r| {
                let person = PersonSummary {
                    first_name: r.first_name,
                    last_name: r.last_name,
                    email: r.email,
                    date_of_birth: r.date_of_birth,
                };
                Ok(ActivityWithPerson {
                    activity: r.activity.try_into().map_err(row_error)?,
                    person,
                })
            })
            .collect()
    }

    async fn list_phone_types(&self) -> Result<Vec<PhoneType>> {
        let rows = sqlx::query_as::<_, PgPhoneTypeRow>(
            "SELECT id, type_name, created_at, updated_at FROM phone_type ORDER BY type_name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_phone_type(&self, type_name: &str) -> Result<PhoneType> {
        let row = sqlx::query_as::<_, PgPhoneTypeRow>(
            r#"
            INSERT INTO phone_type (type_name) VALUES ($1)
            RETURNING id, type_name, created_at, updated_at
            "#,
        )
        .bind(type_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match db_error(e) {
            ContactError::Conflict(_) => {
                ContactError::Conflict(format!("Phone type '{type_name}' already exists"))
            }
            other => other,
        })?;
        Ok(row.into())
    }

    async fn delete_phone_type(&self, id: i64) -> Result<bool> {
        let in_use: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM phone WHERE phone_type_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        if in_use > 0 {
            return Err(ContactError::Conflict(format!(
                "Phone type {id} is still referenced by {in_use} phone(s)"
            )));
        }

        let result = sqlx::query("DELETE FROM phone_type WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match db_error(e) {
                // A phone referencing it appeared after the count.
                ContactError::ForeignKey(_) => {
                    ContactError::Conflict(format!("Phone type {id} is still referenced"))
                }
                other => other,
            })?;
        Ok(result.rows_affected() > 0)
    }
}
