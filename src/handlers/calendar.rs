use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::errors::AppError;
use crate::services::calendar::generate_ics;
use crate::state::AppState;

// GET /api/bookings/:id/calendar.ics
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<i64>,
) -> Result<Response, AppError> {
    let details = state
        .bookings
        .details(booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Booking {booking_id} not found")))?;

    let ics = generate_ics(&details.booking);
    let disposition = format!("attachment; filename=\"booking-{booking_id}.ics\"");

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        ics,
    )
        .into_response())
}
