//! Lookup service: the business layer between the HTTP boundary and the
//! store. Owns request validation, criteria normalization and the
//! existence/uniqueness pre-checks.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::criteria::{Criteria, PersonSearchParams};
use crate::error::{ContactError, Result};
use crate::ports::ContactStore;
use crate::query::compose;
use crate::types::{Activity, ActivityWithPerson, PersonId, PersonWithRelations, PhoneType};
use crate::validate::{
    ActivitySearchParams, CreateActivityRequest, CreatePersonRequest, CreatePhoneTypeRequest,
    UpdatePersonRequest,
};

#[async_trait]
pub trait ContactService: Send + Sync {
    async fn create_person(&self, req: CreatePersonRequest) -> Result<PersonWithRelations>;
    async fn get_person(&self, id: PersonId) -> Result<PersonWithRelations>;
    async fn update_person(
        &self,
        id: PersonId,
        req: UpdatePersonRequest,
    ) -> Result<PersonWithRelations>;
    async fn delete_person(&self, id: PersonId) -> Result<()>;
    async fn search_persons(&self, params: PersonSearchParams)
        -> Result<Vec<PersonWithRelations>>;

    async fn log_activity(&self, req: CreateActivityRequest) -> Result<Activity>;
    async fn search_activities(
        &self,
        params: ActivitySearchParams,
    ) -> Result<Vec<ActivityWithPerson>>;

    async fn list_phone_types(&self) -> Result<Vec<PhoneType>>;
    async fn create_phone_type(&self, req: CreatePhoneTypeRequest) -> Result<PhoneType>;
    async fn delete_phone_type(&self, id: i64) -> Result<()>;
}

pub struct ContactServiceImpl {
    store: Arc<dyn ContactStore>,
}

impl ContactServiceImpl {
    pub fn new(store: Arc<dyn ContactStore>) -> Self {
        Self { store }
    }

    async fn require_person(&self, id: PersonId) -> Result<PersonWithRelations> {
        self.store
            .find_person(id)
            .await?
            .ok_or_else(|| person_not_found(id))
    }
}

fn person_not_found(id: PersonId) -> ContactError {
    ContactError::NotFound(format!("Person {id} not found"))
}

#[async_trait]
impl ContactService for ContactServiceImpl {
    async fn create_person(&self, req: CreatePersonRequest) -> Result<PersonWithRelations> {
        let new = req.validate()?;
        if self.store.email_exists(&new.email).await? {
            return Err(ContactError::Conflict(format!(
                "Email {} already exists",
                new.email
            )));
        }
        let created = self.store.insert_person(new).await?;
        info!(
            person_id = created.person.id,
            phones = created.phones.len(),
            addresses = created.addresses.len(),
            "Created person"
        );
        Ok(created)
    }

    async fn get_person(&self, id: PersonId) -> Result<PersonWithRelations> {
        self.require_person(id).await
    }

    async fn update_person(
        &self,
        id: PersonId,
        req: UpdatePersonRequest,
    ) -> Result<PersonWithRelations> {
        let patch = req.validate()?;
        let current = self.require_person(id).await?;

        if let Some(email) = &patch.email {
            if *email != current.person.email && self.store.email_exists(email).await? {
                return Err(ContactError::Conflict(format!(
                    "Email {email} already exists"
                )));
            }
        }
        if patch.is_empty() {
            return Ok(current);
        }

        let updated = self.store.update_person(id, patch).await?;
        info!(person_id = id, "Updated person");
        Ok(updated)
    }

    async fn delete_person(&self, id: PersonId) -> Result<()> {
        self.require_person(id).await?;
        if !self.store.delete_person(id).await? {
            return Err(person_not_found(id));
        }
        info!(person_id = id, "Deleted person");
        Ok(())
    }

    async fn search_persons(
        &self,
        params: PersonSearchParams,
    ) -> Result<Vec<PersonWithRelations>> {
        let criteria = Criteria::from_params(params)?;
        let plan = compose(&criteria);
        debug!(?plan, "Searching persons");
        self.store.search_persons(&plan).await
    }

    async fn log_activity(&self, req: CreateActivityRequest) -> Result<Activity> {
        let new = req.validate()?;
        self.require_person(new.person_id).await?;
        let person_id = new.person_id;
        let activity = self.store.insert_activity(new).await.map_err(|e| match e {
            // Person deleted between the check and the insert.
            ContactError::ForeignKey(_) => person_not_found(person_id),
            other => other,
        })?;
        info!(
            activity_id = activity.id,
            person_id,
            activity_type = %activity.activity_type,
            "Logged activity"
        );
        Ok(activity)
    }

    async fn search_activities(
        &self,
        params: ActivitySearchParams,
    ) -> Result<Vec<ActivityWithPerson>> {
        let query = params.validate()?;
        let activities = self.store.find_activities(&query).await?;
        if activities.is_empty() {
            self.require_person(query.person_id).await?;
        }
        debug!(
            person_id = query.person_id,
            count = activities.len(),
            "Searched activities"
        );
        Ok(activities)
    }

    async fn list_phone_types(&self) -> Result<Vec<PhoneType>> {
        self.store.list_phone_types().await
    }

    async fn create_phone_type(&self, req: CreatePhoneTypeRequest) -> Result<PhoneType> {
        let name = req.validate()?;
        let created = self.store.insert_phone_type(&name).await?;
        info!(phone_type_id = created.id, type_name = %created.type_name, "Created phone type");
        Ok(created)
    }

    async fn delete_phone_type(&self, id: i64) -> Result<()> {
        if !self.store.delete_phone_type(id).await? {
            return Err(ContactError::NotFound(format!("Phone type {id} not found")));
        }
        info!(phone_type_id = id, "Deleted phone type");
        Ok(())
    }
}
