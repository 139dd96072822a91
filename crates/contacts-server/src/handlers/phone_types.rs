//! /phone-types: the phone type catalogue.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::Path;
use axum::http::StatusCode;
use axum::{Extension, Json};

use contacts_core::service::ContactService;
use contacts_core::types::PhoneType;
use contacts_core::validate::CreatePhoneTypeRequest;

use crate::error::AppError;

pub async fn list_phone_types(
    Extension(service): Extension<Arc<dyn ContactService>>,
) -> Result<Json<Vec<PhoneType>>, AppError> {
    Ok(Json(service.list_phone_types().await?))
}

pub async fn create_phone_type(
    Extension(service): Extension<Arc<dyn ContactService>>,
    payload: Result<Json<CreatePhoneTypeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PhoneType>), AppError> {
    let Json(req) = payload?;
    let phone_type = service.create_phone_type(req).await?;
    Ok((StatusCode::CREATED, Json(phone_type)))
}

pub async fn delete_phone_type(
    Extension(service): Extension<Arc<dyn ContactService>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    service.delete_phone_type(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
