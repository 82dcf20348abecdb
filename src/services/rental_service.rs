//! Ciclo de vida de los alquileres
//!
//! Las decisiones (validación de fechas, ventana de cancelación, cierre
//! tras liquidar pagos) son funciones puras; el servicio las orquesta
//! dentro de transacciones. La creación bloquea la fila del coche antes
//! de contar solapes para que dos reservas concurrentes no puedan
//! quedarse ambas con la última unidad.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::environment::EnvironmentConfig;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::payment::PaymentType;
use crate::models::rental::{Rental, RentalStatus};
use crate::repositories::car_repository::CarRepository;
use crate::repositories::payment_repository::PaymentRepository;
use crate::repositories::rental_repository::{RentalFilter, RentalRepository};
use crate::repositories::user_repository::UserRepository;
use crate::services::availability;
use crate::services::notification_service::{
    self, Notifier,
};
use crate::services::payment_service::PaymentService;
use crate::services::stripe::StripeClient;
use crate::utils::errors::AppError;

/// Máximo de alquileres activos simultáneos por usuario
pub const MAX_ACTIVE_RENTALS: i64 = 3;

/// Horas antes del inicio en las que cancelar deja de ser gratis
pub const FREE_CANCELLATION_HOURS: i64 = 24;

/// Resultado de la ventana de cancelación
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationOutcome {
    Free,
    FeeRequired,
}

/// Qué hacer con el alquiler cuando se liquida un pago
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    ForceCancelled,
    Complete,
    LeaveOpen,
}

/// Validar el rango de fechas de una reserva nueva
pub fn validate_creation(
    today: NaiveDate,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<(), AppError> {
    if start_date < today {
        return Err(AppError::InvalidDateRange(
            "Start date cannot be in the past".to_string(),
        ));
    }
    if end_date < start_date {
        return Err(AppError::InvalidDateRange(
            "End date cannot be before start date".to_string(),
        ));
    }
    Ok(())
}

/// ¿La cancelación es gratuita o lleva tasa?
///
/// El inicio del alquiler se ancla a la medianoche UTC de start_date;
/// con menos de 24 horas por delante (incluidos inicios ya pasados) se
/// cobra la tasa.
pub fn cancellation_window(now: DateTime<Utc>, start_date: NaiveDate) -> CancellationOutcome {
    let start_dt = start_date.and_time(NaiveTime::MIN).and_utc();

    if start_dt - now < Duration::hours(FREE_CANCELLATION_HOURS) {
        CancellationOutcome::FeeRequired
    } else {
        CancellationOutcome::Free
    }
}

/// Decisión de cierre tras marcar un pago como PAID
///
/// Una CANCELLATION_FEE pagada fuerza CANCELLED sin mirar el estado.
/// El resto de pagos solo completan el alquiler si no es terminal y no
/// queda ningún otro pago PENDING.
pub fn settlement_outcome(
    payment_type: PaymentType,
    rental_status: RentalStatus,
    has_other_pending: bool,
) -> SettlementOutcome {
    if payment_type == PaymentType::CancellationFee {
        return SettlementOutcome::ForceCancelled;
    }
    if rental_status.is_terminal() || has_other_pending {
        return SettlementOutcome::LeaveOpen;
    }
    SettlementOutcome::Complete
}

/// Respuesta de la devolución de un coche
#[derive(Debug, Serialize)]
pub struct ReturnOutcome {
    pub message: String,
    pub rental_payment_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overdue_payment_url: Option<String>,
}

/// Respuesta de la cancelación de un alquiler
#[derive(Debug, Serialize)]
pub struct CancelOutcome {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
}

pub struct RentalService {
    pool: PgPool,
    rentals: RentalRepository,
    cars: CarRepository,
    users: UserRepository,
    payment_service: PaymentService,
    notifier: Notifier,
}

impl RentalService {
    pub fn new(
        pool: PgPool,
        stripe: Arc<StripeClient>,
        notifier: Notifier,
        config: Arc<EnvironmentConfig>,
    ) -> Self {
        Self {
            rentals: RentalRepository::new(pool.clone()),
            cars: CarRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            payment_service: PaymentService::new(
                pool.clone(),
                stripe,
                notifier.clone(),
                config,
            ),
            pool,
            notifier,
        }
    }

    /// Crear una reserva aplicando todos los guards en orden
    ///
    /// Fechas -> deudas pendientes -> límite de activos -> disponibilidad.
    /// Todo dentro de una transacción con la fila del coche bloqueada.
    pub async fn create_rental(
        &self,
        actor: &AuthenticatedUser,
        car_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Rental, AppError> {
        let today = Utc::now().date_naive();
        validate_creation(today, start_date, end_date)?;

        let mut tx = self.pool.begin().await?;

        let car = RentalRepository::lock_car(&mut tx, car_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;

        if PaymentRepository::user_has_pending(&mut tx, actor.user_id).await? {
            return Err(AppError::PendingPaymentExists);
        }

        let active = RentalRepository::count_active_for_user(&mut tx, actor.user_id).await?;
        if active >= MAX_ACTIVE_RENTALS {
            return Err(AppError::RentalLimitExceeded(MAX_ACTIVE_RENTALS as u32));
        }

        let overlapping =
            RentalRepository::count_overlapping_booked(&mut tx, car_id, start_date, end_date)
                .await?;
        if !availability::has_availability(car.inventory as i64, overlapping) {
            return Err(AppError::NoAvailability);
        }

        let rental =
            RentalRepository::insert(&mut tx, actor.user_id, car_id, start_date, end_date).await?;

        tx.commit().await?;

        log::info!("🚗 Alquiler {} creado para usuario {}", rental.id, actor.user_id);

        if let Ok(Some(user)) = self.users.find_by_id(actor.user_id).await {
            self.notifier.send(notification_service::message_new_rental(
                &rental, &car, &user.email,
            ));
        }

        Ok(rental)
    }

    /// Buscar un alquiler respetando el ámbito del actor
    ///
    /// Los no-staff solo ven los suyos; fuera de ámbito se responde 404
    /// para no revelar su existencia.
    pub async fn get_rental_scoped(
        &self,
        actor: &AuthenticatedUser,
        rental_id: Uuid,
    ) -> Result<Rental, AppError> {
        let rental = self
            .rentals
            .find_by_id(rental_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Rental not found".to_string()))?;

        if !actor.is_staff && rental.user_id != actor.user_id {
            return Err(AppError::NotFound("Rental not found".to_string()));
        }

        Ok(rental)
    }

    /// Listar alquileres con el ámbito compilado en la query
    pub async fn list_rentals(
        &self,
        actor: &AuthenticatedUser,
        status: Option<RentalStatus>,
        is_active: Option<bool>,
        user_id: Option<Uuid>,
    ) -> Result<Vec<Rental>, AppError> {
        let filter = RentalFilter {
            // El filtro por usuario ajeno solo se compila para staff
            user_id: if actor.is_staff {
                user_id
            } else {
                Some(actor.user_id)
            },
            status,
            is_active,
        };

        self.rentals.list(&filter).await
    }

    /// Registrar la devolución de un coche
    ///
    /// Fija la fecha real, marca OVERDUE si llega tarde y genera los
    /// pagos (base y, si aplica, multa). El alquiler no pasa a COMPLETED
    /// aquí: espera a que el webhook confirme los pagos.
    pub async fn return_car(
        &self,
        actor: &AuthenticatedUser,
        rental_id: Uuid,
    ) -> Result<ReturnOutcome, AppError> {
        let rental = self.get_rental_scoped(actor, rental_id).await?;

        if !rental.status.is_active() {
            return Err(AppError::InvalidState("Rental is not active".to_string()));
        }

        let car = self
            .cars
            .find_by_id(rental.car_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;

        let today = Utc::now().date_naive();
        let is_late = today > rental.end_date;

        let mut tx = self.pool.begin().await?;
        let mut rental = RentalRepository::set_return_date(&mut tx, rental_id, today).await?;
        if is_late {
            rental = RentalRepository::update_status(&mut tx, rental_id, RentalStatus::Overdue)
                .await?;
        }
        tx.commit().await?;

        let rental_payment = self
            .payment_service
            .create_payment_for_rental(&rental, &car, PaymentType::Rental)
            .await?;

        let mut outcome = ReturnOutcome {
            message: "Return registered. Please pay the invoice.".to_string(),
            rental_payment_url: rental_payment.session_url,
            overdue_payment_url: None,
        };

        if is_late {
            let overdue_payment = self
                .payment_service
                .create_payment_for_rental(&rental, &car, PaymentType::OverdueFee)
                .await?;

            outcome.message = "Car returned late. Please pay rental and overdue fee.".to_string();
            outcome.overdue_payment_url = Some(overdue_payment.session_url);
        }

        log::info!("✅ Devolución registrada para alquiler {}", rental_id);

        if let Ok(Some(user)) = self.users.find_by_id(rental.user_id).await {
            self.notifier
                .send(notification_service::message_returned_rental(
                    &rental, &car, &user.email,
                ));
        }

        Ok(outcome)
    }

    /// Cancelar una reserva BOOKED
    ///
    /// Con más de 24 horas hasta el inicio la cancelación es inmediata;
    /// con menos, se genera la tasa y el alquiler queda BOOKED hasta que
    /// el webhook confirme el pago.
    pub async fn cancel_rental(
        &self,
        actor: &AuthenticatedUser,
        rental_id: Uuid,
    ) -> Result<CancelOutcome, AppError> {
        let rental = self.get_rental_scoped(actor, rental_id).await?;

        if rental.status != RentalStatus::Booked {
            return Err(AppError::InvalidState(
                "Cannot cancel this rental".to_string(),
            ));
        }

        let car = self
            .cars
            .find_by_id(rental.car_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;

        match cancellation_window(Utc::now(), rental.start_date) {
            CancellationOutcome::Free => {
                let mut conn = self.pool.acquire().await?;
                let rental =
                    RentalRepository::update_status(&mut conn, rental_id, RentalStatus::Cancelled)
                        .await?;

                log::info!("❌ Alquiler {} cancelado sin coste", rental_id);

                if let Ok(Some(user)) = self.users.find_by_id(rental.user_id).await {
                    self.notifier
                        .send(notification_service::message_cancelled_rental(
                            &rental, &car, &user.email,
                        ));
                }

                Ok(CancelOutcome {
                    message: "Rental cancelled successfully".to_string(),
                    payment_url: None,
                })
            }
            CancellationOutcome::FeeRequired => {
                let payment = self
                    .payment_service
                    .create_payment_for_rental(&rental, &car, PaymentType::CancellationFee)
                    .await?;

                log::info!("💸 Tasa de cancelación generada para alquiler {}", rental_id);

                Ok(CancelOutcome {
                    message: "Late cancellation. Please pay the fee to cancel the reservation."
                        .to_string(),
                    payment_url: Some(payment.session_url),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    mod creation {
        use super::*;

        #[test]
        fn test_start_in_past_rejected() {
            let result = validate_creation(date("2025-06-10"), date("2025-06-09"), date("2025-06-12"));
            assert!(matches!(result, Err(AppError::InvalidDateRange(_))));
        }

        #[test]
        fn test_end_before_start_rejected() {
            let result = validate_creation(date("2025-06-10"), date("2025-06-12"), date("2025-06-11"));
            assert!(matches!(result, Err(AppError::InvalidDateRange(_))));
        }

        #[test]
        fn test_same_day_booking_allowed() {
            assert!(validate_creation(date("2025-06-10"), date("2025-06-10"), date("2025-06-10")).is_ok());
        }
    }

    mod cancellation {
        use super::*;

        fn now() -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap()
        }

        #[test]
        fn test_more_than_24h_before_start_is_free() {
            assert_eq!(
                cancellation_window(now(), date("2025-06-12")),
                CancellationOutcome::Free
            );
        }

        #[test]
        fn test_less_than_24h_before_start_requires_fee() {
            // Empieza a medianoche del día 11: quedan 12 horas
            assert_eq!(
                cancellation_window(now(), date("2025-06-11")),
                CancellationOutcome::FeeRequired
            );
        }

        #[test]
        fn test_already_started_requires_fee() {
            assert_eq!(
                cancellation_window(now(), date("2025-06-10")),
                CancellationOutcome::FeeRequired
            );
        }
    }

    mod settlement {
        use super::*;

        #[test]
        fn test_last_payment_completes_rental() {
            assert_eq!(
                settlement_outcome(PaymentType::Rental, RentalStatus::Booked, false),
                SettlementOutcome::Complete
            );
        }

        #[test]
        fn test_overdue_rental_completes_when_fine_is_last() {
            assert_eq!(
                settlement_outcome(PaymentType::OverdueFee, RentalStatus::Overdue, false),
                SettlementOutcome::Complete
            );
        }

        #[test]
        fn test_pending_sibling_payment_keeps_rental_open() {
            // Pagó la base pero la multa sigue PENDING
            assert_eq!(
                settlement_outcome(PaymentType::Rental, RentalStatus::Overdue, true),
                SettlementOutcome::LeaveOpen
            );
        }

        #[test]
        fn test_cancellation_fee_forces_cancelled() {
            assert_eq!(
                settlement_outcome(PaymentType::CancellationFee, RentalStatus::Booked, false),
                SettlementOutcome::ForceCancelled
            );
            // Incluso si el alquiler ya es terminal
            assert_eq!(
                settlement_outcome(PaymentType::CancellationFee, RentalStatus::Completed, true),
                SettlementOutcome::ForceCancelled
            );
        }

        #[test]
        fn test_terminal_rental_left_untouched() {
            assert_eq!(
                settlement_outcome(PaymentType::Rental, RentalStatus::Cancelled, false),
                SettlementOutcome::LeaveOpen
            );
        }
    }
}
