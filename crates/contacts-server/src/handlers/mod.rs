pub mod activities;
pub mod health;
pub mod persons;
pub mod phone_types;

use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Json;

/// JSON 404 for any unmatched route.
pub async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "not_found",
            "message": format!("Route {} not found", uri.path()),
        })),
    )
}
