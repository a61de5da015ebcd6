pub mod blog;
pub mod bookings;
pub mod calendar;
pub mod catalog;
pub mod health;

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::errors::AppError;
use crate::state::AppState;

/// Unwraps a JSON body, turning a malformed one into a 400 with the usual
/// `{success, message}` shape.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e.body_text())))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/services", get(catalog::list_services))
        .route("/api/bookings", post(bookings::create_booking))
        .route("/api/bookings/:id", get(bookings::get_booking))
        .route(
            "/api/bookings/:id/calendar.ics",
            get(calendar::download_ics),
        )
        .route(
            "/api/blog/posts",
            get(blog::list_posts).post(blog::create_post),
        )
        .route(
            "/api/blog/posts/:id",
            get(blog::get_post)
                .put(blog::update_post)
                .delete(blog::delete_post),
        )
        .route("/api/blog/posts/:id/publish", post(blog::publish_post))
        .route("/api/blog/posts/:id/unpublish", post(blog::unpublish_post))
        .route("/api/blog/recent", get(blog::recent_posts))
        .route("/api/blog/tags", get(blog::list_tags))
        .route("/api/blog/tags/:tag/posts", get(blog::posts_by_tag))
        .route(
            "/api/blog/categories/:category/posts",
            get(blog::posts_by_category),
        )
        .route("/api/blog/archive", get(blog::archive_years))
        .route("/api/blog/archive/:year", get(blog::archive_months))
        .route("/api/blog/archive/:year/:month", get(blog::archive_posts))
        .with_state(state)
}
