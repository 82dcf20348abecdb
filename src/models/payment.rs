//! Modelo de Payment
//!
//! Un Payment es una obligación de pago asociada a un alquiler: la tarifa
//! base, una multa por retraso o una tasa de cancelación. Cada uno apunta
//! a una Checkout Session de Stripe. Nunca se borran (auditoría); caen en
//! cascada si se borra el Rental.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado del pago - mapea al ENUM payment_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Expired,
}

/// Tipo de pago - mapea al ENUM payment_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    Rental,
    CancellationFee,
    OverdueFee,
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentType::Rental => write!(f, "RENTAL"),
            PaymentType::CancellationFee => write!(f, "CANCELLATION_FEE"),
            PaymentType::OverdueFee => write!(f, "OVERDUE_FEE"),
        }
    }
}

/// Payment principal - mapea exactamente a la tabla payments
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub rental_id: Uuid,
    pub status: PaymentStatus,
    #[sqlx(rename = "payment_type")]
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub session_id: String,
    pub session_url: String,
    pub money_to_pay: Decimal,
    pub created_at: DateTime<Utc>,
}
