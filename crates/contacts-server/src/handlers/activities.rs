//! /activities: log an interaction and list a person's history.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::http::StatusCode;
use axum::{Extension, Json};

use contacts_core::service::ContactService;
use contacts_core::types::{Activity, ActivityWithPerson};
use contacts_core::validate::{ActivitySearchParams, CreateActivityRequest};

use crate::error::AppError;

pub async fn log_activity(
    Extension(service): Extension<Arc<dyn ContactService>>,
    payload: Result<Json<CreateActivityRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Activity>), AppError> {
    let Json(req) = payload?;
    let activity = service.log_activity(req).await?;
    Ok((StatusCode::CREATED, Json(activity)))
}

pub async fn search_activities(
    Extension(service): Extension<Arc<dyn ContactService>>,
    params: Result<Query<ActivitySearchParams>, QueryRejection>,
) -> Result<Json<Vec<ActivityWithPerson>>, AppError> {
    let Query(params) = params?;
    Ok(Json(service.search_activities(params).await?))
}
