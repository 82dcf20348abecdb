use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::config::environment::EnvironmentConfig;
use crate::dto::common::ApiResponse;
use crate::dto::rental_dto::{
    CreateRentalRequest, RentalDetailResponse, RentalListQuery, RentalResponse,
};
use crate::middleware::auth::AuthenticatedUser;
use crate::repositories::car_repository::CarRepository;
use crate::repositories::payment_repository::PaymentRepository;
use crate::services::notification_service::Notifier;
use crate::services::rental_service::{CancelOutcome, RentalService, ReturnOutcome};
use crate::services::stripe::StripeClient;
use crate::utils::errors::AppError;

pub struct RentalController {
    service: RentalService,
    cars: CarRepository,
    payments: PaymentRepository,
}

impl RentalController {
    pub fn new(
        pool: PgPool,
        stripe: Arc<StripeClient>,
        notifier: Notifier,
        config: Arc<EnvironmentConfig>,
    ) -> Self {
        Self {
            service: RentalService::new(pool.clone(), stripe, notifier, config),
            cars: CarRepository::new(pool.clone()),
            payments: PaymentRepository::new(pool),
        }
    }

    pub async fn create(
        &self,
        actor: &AuthenticatedUser,
        request: CreateRentalRequest,
    ) -> Result<ApiResponse<RentalResponse>, AppError> {
        let rental = self
            .service
            .create_rental(actor, request.car_id, request.start_date, request.end_date)
            .await?;

        let car = self
            .cars
            .find_by_id(rental.car_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;

        Ok(ApiResponse::success_with_message(
            RentalResponse::from_rental(rental, car),
            "Rental created successfully".to_string(),
        ))
    }

    pub async fn list(
        &self,
        actor: &AuthenticatedUser,
        query: RentalListQuery,
    ) -> Result<Vec<RentalResponse>, AppError> {
        let rentals = self
            .service
            .list_rentals(actor, query.status, query.is_active, query.user_id)
            .await?;

        let mut responses = Vec::with_capacity(rentals.len());
        for rental in rentals {
            let car = self
                .cars
                .find_by_id(rental.car_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;
            responses.push(RentalResponse::from_rental(rental, car));
        }

        Ok(responses)
    }

    pub async fn get_by_id(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
    ) -> Result<RentalDetailResponse, AppError> {
        let rental = self.service.get_rental_scoped(actor, id).await?;

        let car = self
            .cars
            .find_by_id(rental.car_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;

        let payments = self.payments.find_by_rental_id(rental.id).await?;

        Ok(RentalDetailResponse::new(rental, car, payments))
    }

    pub async fn return_car(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
    ) -> Result<ReturnOutcome, AppError> {
        self.service.return_car(actor, id).await
    }

    pub async fn cancel(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
    ) -> Result<CancelOutcome, AppError> {
        self.service.cancel_rental(actor, id).await
    }
}
