use std::sync::Arc;

use sqlx::PgPool;

use crate::config::environment::EnvironmentConfig;
use crate::dto::payment_dto::{PaymentListQuery, PaymentResponse};
use crate::middleware::auth::AuthenticatedUser;
use crate::services::notification_service::Notifier;
use crate::services::payment_service::PaymentService;
use crate::services::stripe::StripeClient;
use crate::utils::errors::AppError;

pub struct PaymentController {
    service: PaymentService,
}

impl PaymentController {
    pub fn new(
        pool: PgPool,
        stripe: Arc<StripeClient>,
        notifier: Notifier,
        config: Arc<EnvironmentConfig>,
    ) -> Self {
        Self {
            service: PaymentService::new(pool, stripe, notifier, config),
        }
    }

    pub async fn webhook(&self, signature_header: &str, body: &str) -> Result<(), AppError> {
        self.service.handle_webhook(signature_header, body).await
    }

    pub async fn success(&self, session_id: &str) -> Result<PaymentResponse, AppError> {
        let payment = self.service.find_by_session_id(session_id).await?;

        Ok(payment.into())
    }

    pub async fn list(
        &self,
        actor: &AuthenticatedUser,
        query: PaymentListQuery,
    ) -> Result<Vec<PaymentResponse>, AppError> {
        let payments = self.service.list_payments(actor, query.status).await?;

        Ok(payments.into_iter().map(PaymentResponse::from).collect())
    }
}
