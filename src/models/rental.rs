//! Modelo de Rental
//!
//! Un Rental es el acuerdo de alquiler entre un usuario y un coche.
//! Mapea exactamente a la tabla rentals del schema PostgreSQL.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado del alquiler - mapea al ENUM rental_status
///
/// Transiciones válidas:
/// - BOOKED -> OVERDUE | CANCELLED | COMPLETED
/// - OVERDUE -> COMPLETED
/// COMPLETED y CANCELLED son estados terminales.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "rental_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RentalStatus {
    Booked,
    Completed,
    Cancelled,
    Overdue,
}

impl RentalStatus {
    /// Un alquiler está activo mientras el coche sigue fuera
    pub fn is_active(&self) -> bool {
        matches!(self, RentalStatus::Booked | RentalStatus::Overdue)
    }

    /// Estados terminales: no admiten más transiciones
    pub fn is_terminal(&self) -> bool {
        matches!(self, RentalStatus::Completed | RentalStatus::Cancelled)
    }
}

impl std::fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RentalStatus::Booked => write!(f, "BOOKED"),
            RentalStatus::Completed => write!(f, "COMPLETED"),
            RentalStatus::Cancelled => write!(f, "CANCELLED"),
            RentalStatus::Overdue => write!(f, "OVERDUE"),
        }
    }
}

/// Rental principal - mapea exactamente a la tabla rentals
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Rental {
    pub id: Uuid,
    pub user_id: Uuid,
    pub car_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub status: RentalStatus,
    pub created_at: DateTime<Utc>,
}

impl Rental {
    /// Días facturables del alquiler, contando ambos extremos (mínimo 1)
    pub fn rental_days(&self) -> i64 {
        ((self.end_date - self.start_date).num_days() + 1).max(1)
    }

    /// Coste total: días facturables por la tarifa diaria del coche
    pub fn total_cost(&self, daily_rate: Decimal) -> Decimal {
        Decimal::from(self.rental_days()) * daily_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rental(start: NaiveDate, end: NaiveDate) -> Rental {
        Rental {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            car_id: Uuid::new_v4(),
            start_date: start,
            end_date: end,
            actual_return_date: None,
            status: RentalStatus::Booked,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_rental_days_inclusive() {
        let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        // Dos días naturales: 1 y 2 de junio
        assert_eq!(rental(start, end).rental_days(), 2);
    }

    #[test]
    fn test_same_day_rental_counts_one_day() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(rental(day, day).rental_days(), 1);
    }

    #[test]
    fn test_total_cost() {
        let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let rate: Decimal = "100.00".parse().unwrap();

        assert_eq!(rental(start, end).total_cost(rate), "200.00".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_status_predicates() {
        assert!(RentalStatus::Booked.is_active());
        assert!(RentalStatus::Overdue.is_active());
        assert!(!RentalStatus::Completed.is_active());
        assert!(RentalStatus::Cancelled.is_terminal());
        assert!(!RentalStatus::Overdue.is_terminal());
    }
}
