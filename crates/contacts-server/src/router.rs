//! Router construction for the contacts server.

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Extension, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use contacts_core::service::ContactService;

use crate::handlers;

/// Build the full axum router with all routes and middleware.
pub fn build_router(service: Arc<dyn ContactService>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/persons", post(handlers::persons::create_person))
        // static segment wins over `:id` in the matcher
        .route("/persons/search", get(handlers::persons::search_persons))
        .route(
            "/persons/:id",
            get(handlers::persons::get_person)
                .put(handlers::persons::update_person)
                .delete(handlers::persons::delete_person),
        )
        .route("/activities", post(handlers::activities::log_activity))
        .route(
            "/activities/search",
            get(handlers::activities::search_activities),
        )
        .route(
            "/phone-types",
            get(handlers::phone_types::list_phone_types)
                .post(handlers::phone_types::create_phone_type),
        )
        .route(
            "/phone-types/:id",
            delete(handlers::phone_types::delete_phone_type),
        )
        .fallback(handlers::not_found)
        .layer(Extension(service))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
