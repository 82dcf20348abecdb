//! Orquestación de pagos
//!
//! Crea Checkout Sessions para los alquileres y reconcilia los webhooks
//! de Stripe. La fila local de Payment solo se inserta tras una respuesta
//! correcta del proveedor, así que nunca quedan registros a medias.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;

use crate::config::environment::EnvironmentConfig;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::car::Car;
use crate::models::payment::{Payment, PaymentStatus, PaymentType};
use crate::models::rental::{Rental, RentalStatus};
use crate::repositories::car_repository::CarRepository;
use crate::repositories::payment_repository::{PaymentFilter, PaymentRepository};
use crate::repositories::rental_repository::RentalRepository;
use crate::repositories::user_repository::UserRepository;
use crate::services::notification_service::{self, Notifier};
use crate::services::pricing;
use crate::services::rental_service::{self, SettlementOutcome};
use crate::services::stripe::StripeClient;
use crate::utils::errors::AppError;

/// Evento de webhook de Stripe (solo los campos que usamos)
#[derive(Debug, Deserialize)]
struct StripeEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: StripeEventObject,
}

#[derive(Debug, Deserialize)]
struct StripeEventObject {
    id: String,
}

/// Parsear el cuerpo de un webhook ya verificado
///
/// Un payload firmado pero no parseable se rechaza como firma inválida,
/// igual que cualquier otro webhook que no venga de Stripe.
fn parse_event(body: &str) -> Result<StripeEvent, AppError> {
    serde_json::from_str(body)
        .map_err(|e| AppError::InvalidSignature(format!("Invalid webhook payload: {}", e)))
}

pub struct PaymentService {
    pool: PgPool,
    payments: PaymentRepository,
    cars: CarRepository,
    users: UserRepository,
    stripe: Arc<StripeClient>,
    notifier: Notifier,
    config: Arc<EnvironmentConfig>,
}

impl PaymentService {
    pub fn new(
        pool: PgPool,
        stripe: Arc<StripeClient>,
        notifier: Notifier,
        config: Arc<EnvironmentConfig>,
    ) -> Self {
        Self {
            payments: PaymentRepository::new(pool.clone()),
            cars: CarRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            pool,
            stripe,
            notifier,
            config,
        }
    }

    /// Crear la Checkout Session y el Payment local para un alquiler
    pub async fn create_payment_for_rental(
        &self,
        rental: &Rental,
        car: &Car,
        payment_type: PaymentType,
    ) -> Result<Payment, AppError> {
        let amount = pricing::calculate_amount(payment_type, rental, car.daily_rate)?;

        let product_name = format!("Rental #{} — {}", rental.id, payment_type);
        let success_url = format!(
            "{}?session_id={{CHECKOUT_SESSION_ID}}",
            self.config.stripe_success_url
        );

        let session = self
            .stripe
            .create_checkout_session(
                &product_name,
                amount,
                &success_url,
                &self.config.stripe_cancel_url,
            )
            .await?;

        self.payments
            .create(rental.id, payment_type, session.id, session.url, amount)
            .await
    }

    /// Procesar un webhook entrante de Stripe
    ///
    /// Verifica la firma, descarta los tipos de evento que no nos
    /// interesan y liquida la sesión completada.
    pub async fn handle_webhook(
        &self,
        signature_header: &str,
        body: &str,
    ) -> Result<(), AppError> {
        self.stripe
            .verify_webhook_signature(signature_header, body, Utc::now().timestamp())?;

        let event = parse_event(body)?;

        if event.event_type != "checkout.session.completed" {
            log::debug!("🤷 Evento de webhook ignorado: {}", event.event_type);
            return Ok(());
        }

        self.settle_session(&event.data.object.id).await
    }

    /// Liquidar una Checkout Session completada
    ///
    /// Idempotente: sesiones desconocidas se ignoran y los replays de un
    /// pago ya PAID no vuelven a tocar nada ni a notificar. El pago y el
    /// alquiler se bloquean en la misma transacción.
    async fn settle_session(&self, session_id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let Some(payment) =
            PaymentRepository::find_by_session_id_for_update(&mut tx, session_id).await?
        else {
            log::warn!("🤷 Webhook para sesión desconocida: {}", session_id);
            return Ok(());
        };

        if payment.status == PaymentStatus::Paid {
            log::info!("🔁 Replay de webhook para pago {} ya liquidado", payment.id);
            return Ok(());
        }

        let payment = PaymentRepository::mark_paid(&mut tx, payment.id).await?;

        let rental = RentalRepository::find_by_id_for_update(&mut tx, payment.rental_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal("Payment references a missing rental".to_string())
            })?;

        let has_other_pending =
            PaymentRepository::rental_has_other_pending(&mut tx, rental.id, payment.id).await?;

        let outcome =
            rental_service::settlement_outcome(payment.payment_type, rental.status, has_other_pending);

        let rental = match outcome {
            SettlementOutcome::ForceCancelled => {
                RentalRepository::update_status(&mut tx, rental.id, RentalStatus::Cancelled)
                    .await?
            }
            SettlementOutcome::Complete => {
                RentalRepository::update_status(&mut tx, rental.id, RentalStatus::Completed)
                    .await?
            }
            SettlementOutcome::LeaveOpen => rental,
        };

        tx.commit().await?;

        log::info!(
            "💰 Pago {} liquidado ({:?}), alquiler {} -> {}",
            payment.id,
            outcome,
            rental.id,
            rental.status
        );

        if let (Ok(Some(car)), Ok(Some(user))) = (
            self.cars.find_by_id(rental.car_id).await,
            self.users.find_by_id(rental.user_id).await,
        ) {
            self.notifier
                .send(notification_service::message_successful_payment(
                    &payment, &car, &user.email,
                ));

            if outcome == SettlementOutcome::ForceCancelled {
                self.notifier
                    .send(notification_service::message_cancelled_rental(
                        &rental, &car, &user.email,
                    ));
            }
        }

        Ok(())
    }

    /// Landing de éxito del checkout
    pub async fn find_by_session_id(&self, session_id: &str) -> Result<Payment, AppError> {
        self.payments
            .find_by_session_id(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))
    }

    /// Listar pagos con el ámbito del actor compilado en la query
    pub async fn list_payments(
        &self,
        actor: &AuthenticatedUser,
        status: Option<PaymentStatus>,
    ) -> Result<Vec<Payment>, AppError> {
        let filter = PaymentFilter {
            user_id: if actor.is_staff {
                None
            } else {
                Some(actor.user_id)
            },
            status,
        };

        self.payments.list(&filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_session_event_parses() {
        let body = r#"{"type":"checkout.session.completed","data":{"object":{"id":"cs_test_1"}}}"#;

        let event = parse_event(body).unwrap();

        assert_eq!(event.event_type, "checkout.session.completed");
        assert_eq!(event.data.object.id, "cs_test_1");
    }

    #[test]
    fn test_malformed_payload_rejected_as_invalid_signature() {
        let result = parse_event("this is not json");
        assert!(matches!(result, Err(AppError::InvalidSignature(_))));
    }

    #[test]
    fn test_payload_missing_session_id_rejected() {
        let result = parse_event(r#"{"type":"checkout.session.completed","data":{"object":{}}}"#);
        assert!(matches!(result, Err(AppError::InvalidSignature(_))));
    }
}
