use std::sync::LazyLock;

use chrono::{SubsecRound, Utc};
use regex::Regex;
use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;

use crate::db::{self, queries, DbPool};
use crate::errors::AppError;
use crate::models::{
    BookingConfirmation, BookingDetails, BookingRequest, BookingServiceLine, LineItem, NewBooking,
};
use crate::services::timing;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

pub const MAX_SESSION_MINUTES: i64 = 24 * 60;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid time '{0}', expected HH:MM or H:MM AM/PM")]
    InvalidTime(String),

    #[error("Unknown timezone '{0}'")]
    InvalidTimezone(String),

    #[error("Session duration must be between 1 and 1440 minutes")]
    InvalidSessionDuration,

    #[error("At least one service must be provided for the booking.")]
    EmptyServices,

    #[error("Quantity for service {0} must be at least 1")]
    InvalidQuantity(i64),

    #[error("Service with ID {0} not found")]
    ServiceNotFound(i64),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl BookingError {
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::MissingField(_) => "missing_field",
            BookingError::InvalidEmail => "invalid_email",
            BookingError::InvalidDate(_) => "invalid_date",
            BookingError::InvalidTime(_) => "invalid_time",
            BookingError::InvalidTimezone(_) => "invalid_timezone",
            BookingError::InvalidSessionDuration => "invalid_session_duration",
            BookingError::EmptyServices => "empty_services",
            BookingError::InvalidQuantity(_) => "invalid_quantity",
            BookingError::ServiceNotFound(_) => "service_not_found",
            BookingError::Storage(_) => "storage_error",
        }
    }

    /// Everything except storage failures is the caller's fault.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, BookingError::Storage(_))
    }
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, BookingError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(BookingError::MissingField(field)),
    }
}

/// Checks every field of the request and normalizes its time into a UTC
/// instant plus local start/end strings. Touches no storage.
pub fn validate_request(
    req: &BookingRequest,
    default_session_minutes: i64,
) -> Result<NewBooking, BookingError> {
    let name = required(&req.name, "name")?;
    let email = required(&req.email, "email")?;
    let date = required(&req.date, "date")?;
    let time = required(&req.time, "time")?;
    let timezone = required(&req.timezone, "timezone")?;
    let topic = required(&req.topic, "topic")?;
    let message = required(&req.message, "message")?;

    if !EMAIL_RE.is_match(email) {
        return Err(BookingError::InvalidEmail);
    }

    let date = timing::parse_date(date).ok_or_else(|| BookingError::InvalidDate(date.to_string()))?;
    let start = timing::parse_time_of_day(time)
        .ok_or_else(|| BookingError::InvalidTime(time.to_string()))?;
    let tz = timing::parse_timezone(timezone)
        .ok_or_else(|| BookingError::InvalidTimezone(timezone.to_string()))?;

    let duration_minutes = req.session_duration.unwrap_or(default_session_minutes);
    if !(1..=MAX_SESSION_MINUTES).contains(&duration_minutes) {
        return Err(BookingError::InvalidSessionDuration);
    }

    let requested = match req.services.as_deref() {
        Some(items) if !items.is_empty() => items,
        _ => return Err(BookingError::EmptyServices),
    };

    let mut lines: Vec<LineItem> = Vec::with_capacity(requested.len());
    for item in requested {
        let service_id = item
            .service_id
            .ok_or(BookingError::MissingField("services.serviceId"))?;
        let quantity = item.quantity.unwrap_or(1);
        if quantity < 1 {
            return Err(BookingError::InvalidQuantity(service_id));
        }
        match lines.iter_mut().find(|l| l.service_id == service_id) {
            Some(line) => {
                line.quantity = line
                    .quantity
                    .checked_add(quantity)
                    .ok_or(BookingError::InvalidQuantity(service_id))?;
            }
            None => lines.push(LineItem {
                service_id,
                quantity,
            }),
        }
    }

    let booking_utc = timing::local_to_utc(date, start, tz)
        .ok_or_else(|| BookingError::InvalidTime(format!("{time} does not exist in {timezone}")))?;

    Ok(NewBooking {
        customer_name: name.to_string(),
        customer_email: email.to_string(),
        booking_subject: topic.to_string(),
        booking_utc,
        start_time_local: timing::format_hm(start),
        end_time_local: timing::format_hm(timing::session_end(start, duration_minutes)),
        timezone: tz.name().to_string(),
        duration_minutes,
        notes: message.to_string(),
        lines,
    })
}

/// Validates booking requests and persists them through the injected pool.
#[derive(Clone)]
pub struct BookingProcessor {
    pool: DbPool,
    default_session_minutes: i64,
}

impl BookingProcessor {
    pub fn new(pool: DbPool, default_session_minutes: i64) -> Self {
        Self {
            pool,
            default_session_minutes,
        }
    }

    /// Validation runs before a connection is checked out, so a rejected
    /// request never touches storage.
    pub async fn submit(&self, req: &BookingRequest) -> Result<BookingConfirmation, AppError> {
        let booking = validate_request(req, self.default_session_minutes)?;

        db::with_conn(&self.pool, move |conn| Ok(create_booking(conn, &booking)?))
            .await
            .map_err(|e| e.with_message("Failed to create booking"))
    }

    pub async fn details(&self, booking_id: i64) -> Result<Option<BookingDetails>, AppError> {
        db::with_conn(&self.pool, move |conn| {
            Ok(get_booking_details(conn, booking_id)?)
        })
        .await
    }
}

/// Writes the booking and its service lines in one transaction. A line that
/// names an unknown service aborts the whole booking; the transaction is
/// rolled back when dropped without commit.
pub fn create_booking(
    conn: &mut Connection,
    booking: &NewBooking,
) -> Result<BookingConfirmation, BookingError> {
    if booking.lines.is_empty() {
        return Err(BookingError::EmptyServices);
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let created_at = Utc::now().trunc_subsecs(3);
    let booking_id = queries::insert_booking(&tx, booking, &created_at)?;

    let mut revenue = Decimal::ZERO;
    for item in &booking.lines {
        let service = queries::get_service(&tx, item.service_id)?
            .ok_or(BookingError::ServiceNotFound(item.service_id))?;

        let agreed_price = service.default_price * Decimal::from(item.quantity);
        queries::insert_booking_line(
            &tx,
            &BookingServiceLine {
                booking_id,
                service_id: item.service_id,
                quantity: item.quantity,
                agreed_price,
            },
        )?;
        revenue += agreed_price;
    }

    queries::update_booking_revenue(&tx, booking_id, revenue)?;
    tx.commit()?;

    tracing::info!(booking_id, %revenue, lines = booking.lines.len(), "booking created");

    Ok(BookingConfirmation {
        booking_id,
        created_at,
        total_revenue: revenue,
    })
}

pub fn get_booking_details(
    conn: &Connection,
    booking_id: i64,
) -> rusqlite::Result<Option<BookingDetails>> {
    let Some(booking) = queries::get_booking_by_id(conn, booking_id)? else {
        return Ok(None);
    };
    let services = queries::get_booking_lines(conn, booking_id)?;
    Ok(Some(BookingDetails { booking, services }))
}
