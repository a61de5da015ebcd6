use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub booking_subject: String,
    pub booking_utc: DateTime<Utc>,
    pub start_time_local: String,
    pub end_time_local: String,
    pub timezone: String,
    pub duration_minutes: i64,
    pub notes: String,
    pub booking_status: BookingStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue: Decimal,
    pub created_at_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Confirmed" => BookingStatus::Confirmed,
            "Cancelled" => BookingStatus::Cancelled,
            _ => BookingStatus::Pending,
        }
    }
}

/// One priced service on a booking. `agreed_price` is the line total,
/// frozen when the booking was made.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingServiceLine {
    pub booking_id: i64,
    pub service_id: i64,
    pub quantity: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub agreed_price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingDetails {
    pub booking: Booking,
    pub services: Vec<BookingServiceLine>,
}

/// Raw booking form as posted by the site. Every field is optional here so
/// a missing one is reported by name instead of as a body rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub timezone: Option<String>,
    pub topic: Option<String>,
    pub message: Option<String>,
    pub services: Option<Vec<LineItemRequest>>,
    pub session_duration: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    pub service_id: Option<i64>,
    pub quantity: Option<i64>,
}

/// A booking that passed validation and time normalization, ready to be
/// written. Line items are already merged per service.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub customer_name: String,
    pub customer_email: String,
    pub booking_subject: String,
    pub booking_utc: DateTime<Utc>,
    pub start_time_local: String,
    pub end_time_local: String,
    pub timezone: String,
    pub duration_minutes: i64,
    pub notes: String,
    pub lines: Vec<LineItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItem {
    pub service_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingConfirmation {
    pub booking_id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue: Decimal,
}
