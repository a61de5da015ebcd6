use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A priced offering that can be attached to a booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub service_id: i64,
    pub service_name: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub default_price: Decimal,
}
