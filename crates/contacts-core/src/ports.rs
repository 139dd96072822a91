//! Persistence port. Implemented by `contacts-postgres` and by
//! [`crate::memory::MemoryStore`].

use async_trait::async_trait;

use crate::error::Result;
use crate::query::SearchPlan;
use crate::types::{
    Activity, ActivityQuery, ActivityWithPerson, NewActivity, NewPerson, PersonId, PersonPatch,
    PersonWithRelations, PhoneType,
};

#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn find_person(&self, id: PersonId) -> Result<Option<PersonWithRelations>>;

    async fn email_exists(&self, email: &str) -> Result<bool>;

    /// Insert a person with its phones and addresses as one unit.
    ///
    /// Unknown phone type names fail with `ForeignKey` before anything is
    /// written. A duplicate email fails with `Conflict`.
    async fn insert_person(&self, person: NewPerson) -> Result<PersonWithRelations>;

    /// `NotFound` when the row vanished.
    async fn update_person(&self, id: PersonId, patch: PersonPatch)
        -> Result<PersonWithRelations>;

    /// Delete a person and everything it owns. Returns false when absent.
    async fn delete_person(&self, id: PersonId) -> Result<bool>;

    async fn search_persons(&self, plan: &SearchPlan) -> Result<Vec<PersonWithRelations>>;

    async fn insert_activity(&self, activity: NewActivity) -> Result<Activity>;

    /// Activities ordered by activity date, newest first.
    async fn find_activities(&self, query: &ActivityQuery) -> Result<Vec<ActivityWithPerson>>;

    /// Phone types ordered by name.
    async fn list_phone_types(&self) -> Result<Vec<PhoneType>>;

    /// `Conflict` when the name is taken.
    async fn insert_phone_type(&self, type_name: &str) -> Result<PhoneType>;

    /// Returns false when absent. `Conflict` while phones still reference it.
    async fn delete_phone_type(&self, id: i64) -> Result<bool>;
}
