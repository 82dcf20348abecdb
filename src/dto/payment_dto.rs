use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::payment::{Payment, PaymentStatus, PaymentType};

// Query params del listado de pagos
#[derive(Debug, Default, Deserialize)]
pub struct PaymentListQuery {
    pub status: Option<PaymentStatus>,
}

// Query params de la landing de éxito del checkout
#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    pub session_id: String,
}

// Response de pago
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub rental_id: Uuid,
    pub status: PaymentStatus,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub session_id: String,
    pub session_url: String,
    pub money_to_pay: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            rental_id: payment.rental_id,
            status: payment.status,
            payment_type: payment.payment_type,
            session_id: payment.session_id,
            session_url: payment.session_url,
            money_to_pay: payment.money_to_pay,
            created_at: payment.created_at,
        }
    }
}
