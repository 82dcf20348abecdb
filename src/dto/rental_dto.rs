use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dto::car_dto::CarResponse;
use crate::dto::payment_dto::PaymentResponse;
use crate::models::car::Car;
use crate::models::payment::Payment;
use crate::models::rental::{Rental, RentalStatus};

// Request para crear una reserva
#[derive(Debug, Deserialize)]
pub struct CreateRentalRequest {
    pub car_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

// Query params del listado de alquileres
#[derive(Debug, Default, Deserialize)]
pub struct RentalListQuery {
    pub status: Option<RentalStatus>,
    pub is_active: Option<bool>,
    /// Solo surte efecto para staff
    pub user_id: Option<Uuid>,
}

// Response de alquiler con el coche embebido
#[derive(Debug, Serialize)]
pub struct RentalResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub car: CarResponse,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub status: RentalStatus,
    pub rental_days: i64,
    pub total_cost: Decimal,
    pub created_at: DateTime<Utc>,
}

impl RentalResponse {
    pub fn from_rental(rental: Rental, car: Car) -> Self {
        let rental_days = rental.rental_days();
        let total_cost = rental.total_cost(car.daily_rate);

        Self {
            id: rental.id,
            user_id: rental.user_id,
            car: CarResponse::from_car(car),
            start_date: rental.start_date,
            end_date: rental.end_date,
            actual_return_date: rental.actual_return_date,
            status: rental.status,
            rental_days,
            total_cost,
            created_at: rental.created_at,
        }
    }
}

// Response de detalle con los pagos del alquiler
#[derive(Debug, Serialize)]
pub struct RentalDetailResponse {
    #[serde(flatten)]
    pub rental: RentalResponse,
    pub payments: Vec<PaymentResponse>,
}

impl RentalDetailResponse {
    pub fn new(rental: Rental, car: Car, payments: Vec<Payment>) -> Self {
        Self {
            rental: RentalResponse::from_rental(rental, car),
            payments: payments.into_iter().map(PaymentResponse::from).collect(),
        }
    }
}
