use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::dto::car_dto::{CarListQuery, CarResponse, CreateCarRequest, UpdateCarRequest};
use crate::dto::common::ApiResponse;
use crate::repositories::car_repository::CarRepository;
use crate::utils::errors::AppError;

/// Fechas a medias no anotan disponibilidad real: o rango completo o nada
fn require_complete_range(
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<(), AppError> {
    if start_date.is_some() != end_date.is_some() {
        return Err(AppError::BadRequest(
            "Both start_date and end_date are required to check availability".to_string(),
        ));
    }
    Ok(())
}

pub struct CarController {
    repository: CarRepository,
}

impl CarController {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: CarRepository::new(pool),
        }
    }

    pub async fn list(&self, query: CarListQuery) -> Result<Vec<CarResponse>, AppError> {
        require_complete_range(query.start_date, query.end_date)?;

        let cars = self.repository.list(&query.into()).await?;

        Ok(cars.into_iter().map(CarResponse::from).collect())
    }

    pub async fn get_by_id(
        &self,
        id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<CarResponse, AppError> {
        require_complete_range(start_date, end_date)?;

        let car = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;

        let available = self
            .repository
            .available_units(&car, start_date, end_date)
            .await?;

        Ok(CarResponse::with_availability(car, available))
    }

    pub async fn create(
        &self,
        request: CreateCarRequest,
    ) -> Result<ApiResponse<CarResponse>, AppError> {
        request.validate()?;

        if request.daily_rate <= Decimal::ZERO {
            return Err(AppError::BadRequest(
                "daily_rate must be greater than zero".to_string(),
            ));
        }

        let car = self
            .repository
            .create(
                request.brand,
                request.model,
                request.year,
                request.fuel_type,
                request.daily_rate,
                request.inventory,
                request.image_url,
            )
            .await?;

        log::info!("🚙 Coche creado: {}", car.display_name());

        Ok(ApiResponse::success_with_message(
            CarResponse::from_car(car),
            "Car created successfully".to_string(),
        ))
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateCarRequest,
    ) -> Result<ApiResponse<CarResponse>, AppError> {
        request.validate()?;

        if let Some(rate) = request.daily_rate {
            if rate <= Decimal::ZERO {
                return Err(AppError::BadRequest(
                    "daily_rate must be greater than zero".to_string(),
                ));
            }
        }

        let car = self
            .repository
            .update(
                id,
                request.brand,
                request.model,
                request.year,
                request.fuel_type,
                request.daily_rate,
                request.inventory,
                request.image_url,
            )
            .await?;

        Ok(ApiResponse::success_with_message(
            CarResponse::from_car(car),
            "Car updated successfully".to_string(),
        ))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.repository.delete(id).await?;

        log::info!("🗑️ Coche {} eliminado", id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> Option<NaiveDate> {
        s.parse().ok()
    }

    #[test]
    fn test_half_specified_range_rejected() {
        let start = date("2025-06-01");

        assert!(matches!(
            require_complete_range(start, None),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            require_complete_range(None, start),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_complete_or_empty_range_accepted() {
        assert!(require_complete_range(date("2025-06-01"), date("2025-06-03")).is_ok());
        assert!(require_complete_range(None, None).is_ok());
    }
}
