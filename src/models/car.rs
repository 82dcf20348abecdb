//! Modelo de Car
//!
//! Mapea exactamente a la tabla cars del schema PostgreSQL.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Tipo de combustible - mapea al ENUM fuel_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "fuel_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FuelType {
    Gas,
    Diesel,
    Hybrid,
    Electric,
}

/// Car principal - un modelo de coche de la flota, con su inventario total
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Car {
    pub id: Uuid,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub fuel_type: FuelType,
    pub daily_rate: Decimal,
    pub inventory: i32,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Car {
    /// Descripción legible del coche, usada en notificaciones
    pub fn display_name(&self) -> String {
        format!("{} {} ({})", self.brand, self.model, self.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        let car = Car {
            id: Uuid::new_v4(),
            brand: "BMW".to_string(),
            model: "X5".to_string(),
            year: 2023,
            fuel_type: FuelType::Gas,
            daily_rate: "100.00".parse().unwrap(),
            inventory: 1,
            image_url: None,
            created_at: Utc::now(),
        };

        assert_eq!(car.display_name(), "BMW X5 (2023)");
    }
}
