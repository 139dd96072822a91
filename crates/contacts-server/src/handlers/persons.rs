//! /persons: create, read, update, delete and the dynamic search.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::{Extension, Json};

use contacts_core::criteria::PersonSearchParams;
use contacts_core::service::ContactService;
use contacts_core::types::{PersonId, PersonWithRelations};
use contacts_core::validate::{CreatePersonRequest, UpdatePersonRequest};

use crate::error::AppError;

pub async fn create_person(
    Extension(service): Extension<Arc<dyn ContactService>>,
    payload: Result<Json<CreatePersonRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PersonWithRelations>), AppError> {
    let Json(req) = payload?;
    let person = service.create_person(req).await?;
    Ok((StatusCode::CREATED, Json(person)))
}

pub async fn get_person(
    Extension(service): Extension<Arc<dyn ContactService>>,
    id: Result<Path<PersonId>, PathRejection>,
) -> Result<Json<PersonWithRelations>, AppError> {
    let Path(id) = id?;
    Ok(Json(service.get_person(id).await?))
}

pub async fn update_person(
    Extension(service): Extension<Arc<dyn ContactService>>,
    id: Result<Path<PersonId>, PathRejection>,
    payload: Result<Json<UpdatePersonRequest>, JsonRejection>,
) -> Result<Json<PersonWithRelations>, AppError> {
    let Path(id) = id?;
    let Json(req) = payload?;
    Ok(Json(service.update_person(id, req).await?))
}

pub async fn delete_person(
    Extension(service): Extension<Arc<dyn ContactService>>,
    id: Result<Path<PersonId>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    service.delete_person(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /persons/search?q=... or any of email, firstName, lastName,
/// dateOfBirth, phone, phoneType.
pub async fn search_persons(
    Extension(service): Extension<Arc<dyn ContactService>>,
    params: Result<Query<PersonSearchParams>, QueryRejection>,
) -> Result<Json<Vec<PersonWithRelations>>, AppError> {
    let Query(params) = params?;
    Ok(Json(service.search_persons(params).await?))
}
