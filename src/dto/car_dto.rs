use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::car::{Car, FuelType};
use crate::repositories::car_repository::{CarFilter, CarWithAvailability};

// Request para crear un coche (solo staff)
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCarRequest {
    #[validate(length(min = 1, message = "Brand is required"))]
    pub brand: String,
    #[validate(length(min = 1, message = "Model is required"))]
    pub model: String,
    #[validate(range(min = 1950, max = 2100, message = "Year out of range"))]
    pub year: i32,
    pub fuel_type: FuelType,
    pub daily_rate: Decimal,
    #[validate(range(min = 0, message = "Inventory cannot be negative"))]
    pub inventory: i32,
    pub image_url: Option<String>,
}

// Request para actualizar un coche (campos opcionales)
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCarRequest {
    pub brand: Option<String>,
    pub model: Option<String>,
    #[validate(range(min = 1950, max = 2100, message = "Year out of range"))]
    pub year: Option<i32>,
    pub fuel_type: Option<FuelType>,
    pub daily_rate: Option<Decimal>,
    #[validate(range(min = 0, message = "Inventory cannot be negative"))]
    pub inventory: Option<i32>,
    pub image_url: Option<String>,
}

// Query params del listado del catálogo
#[derive(Debug, Default, Deserialize)]
pub struct CarListQuery {
    pub brand: Option<String>,
    pub fuel_type: Option<FuelType>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub available: Option<bool>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl From<CarListQuery> for CarFilter {
    fn from(query: CarListQuery) -> Self {
        Self {
            brand: query.brand,
            fuel_type: query.fuel_type,
            price_min: query.price_min,
            price_max: query.price_max,
            min_year: query.min_year,
            max_year: query.max_year,
            available: query.available,
            start_date: query.start_date,
            end_date: query.end_date,
        }
    }
}

// Response de coche, con disponibilidad cuando se calculó
#[derive(Debug, Serialize)]
pub struct CarResponse {
    pub id: Uuid,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub fuel_type: FuelType,
    pub daily_rate: Decimal,
    pub inventory: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cars_available: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CarResponse {
    pub fn from_car(car: Car) -> Self {
        Self {
            id: car.id,
            brand: car.brand,
            model: car.model,
            year: car.year,
            fuel_type: car.fuel_type,
            daily_rate: car.daily_rate,
            inventory: car.inventory,
            cars_available: None,
            image_url: car.image_url,
            created_at: car.created_at,
        }
    }

    pub fn with_availability(car: Car, cars_available: i64) -> Self {
        let mut response = Self::from_car(car);
        response.cars_available = Some(cars_available);
        response
    }
}

impl From<CarWithAvailability> for CarResponse {
    fn from(annotated: CarWithAvailability) -> Self {
        Self::with_availability(annotated.car, annotated.cars_available)
    }
}
