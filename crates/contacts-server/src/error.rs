//! Maps [`ContactError`] onto HTTP responses.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use contacts_core::error::{ContactError, FieldError};

#[derive(Debug)]
pub struct AppError(pub ContactError);

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a [FieldError]>,
}

impl From<ContactError> for AppError {
    fn from(e: ContactError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ContactError::invalid("body", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self(ContactError::invalid("query", rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(_: PathRejection) -> Self {
        Self(ContactError::invalid("id", "ID must be a valid number"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let (message, details) = match &err {
            ContactError::Validation(fields) => {
                ("Validation failed".to_string(), Some(fields.as_slice()))
            }
            ContactError::NotFound(m) | ContactError::Conflict(m) | ContactError::ForeignKey(m) => {
                (m.clone(), None)
            }
            ContactError::Internal(e) => {
                tracing::error!(error = format!("{e:#}"), "Unhandled error");
                ("Something went wrong".to_string(), None)
            }
        };

        let body = ErrorBody {
            error: err.kind(),
            message,
            details,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn render(err: ContactError) -> (StatusCode, serde_json::Value) {
        let resp = AppError(err).into_response();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_carries_field_details() {
        let (status, body) = render(ContactError::invalid("email", "Invalid email format")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["details"][0]["field"], "email");
    }

    #[tokio::test]
    async fn internal_detail_is_not_exposed() {
        let (status, body) =
            render(ContactError::Internal(anyhow::anyhow!("connection reset by peer"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["message"], "Something went wrong");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn foreign_key_is_bad_request() {
        let (status, body) = render(ContactError::ForeignKey("phone type 'pager'".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "foreign_key");
    }
}
