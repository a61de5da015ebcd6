use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::errors::AppError;
use crate::handlers::json_body;
use crate::models::BookingRequest;
use crate::state::AppState;

// POST /api/bookings
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingCreatedResponse {
    success: bool,
    message: &'static str,
    booking_id: i64,
    created_at: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::float")]
    total_revenue: Decimal,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingCreatedResponse>), AppError> {
    let req = json_body(payload)?;

    tracing::info!(
        email = req.email.as_deref().unwrap_or(""),
        date = req.date.as_deref().unwrap_or(""),
        time = req.time.as_deref().unwrap_or(""),
        timezone = req.timezone.as_deref().unwrap_or(""),
        services = req.services.as_ref().map_or(0, Vec::len),
        "received booking request"
    );

    let confirmation = match state.bookings.submit(&req).await {
        Ok(c) => c,
        Err(e) => {
            if let AppError::Booking(inner) = &e {
                tracing::warn!(code = inner.code(), "booking rejected: {inner}");
            }
            return Err(e);
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(BookingCreatedResponse {
            success: true,
            message: "Booking created successfully",
            booking_id: confirmation.booking_id,
            created_at: confirmation.created_at,
            total_revenue: confirmation.total_revenue,
        }),
    ))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let details = state
        .bookings
        .details(booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Booking {booking_id} not found")))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "booking": details.booking,
        "services": details.services,
    })))
}
