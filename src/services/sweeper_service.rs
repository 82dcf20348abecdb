//! Barridos periódicos
//!
//! Dos tareas de mantenimiento corren en un loop de intervalo fijo:
//! expirar pagos PENDING viejos y marcar OVERDUE las reservas vencidas
//! sin devolución. Ambas son idempotentes (los filtros por estado hacen
//! que una segunda pasada no encuentre nada) y un fallo en un elemento
//! no detiene el resto del barrido.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::PgPool;

use crate::config::environment::EnvironmentConfig;
use crate::models::payment::Payment;
use crate::models::rental::{Rental, RentalStatus};
use crate::repositories::car_repository::CarRepository;
use crate::repositories::payment_repository::PaymentRepository;
use crate::repositories::rental_repository::RentalRepository;
use crate::repositories::user_repository::UserRepository;
use crate::services::notification_service::{self, Notifier};
use crate::utils::errors::AppError;

/// Horas de vida de una Checkout Session pendiente
pub const PAYMENT_EXPIRY_HOURS: i64 = 24;

/// Umbral de expiración: los pagos PENDING creados antes caducan
pub fn expiry_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(PAYMENT_EXPIRY_HOURS)
}

/// ¿Debe marcarse OVERDUE este alquiler hoy?
///
/// Solo reservas BOOKED con la fecha de fin ya vencida y sin devolución
/// registrada. Un alquiler ya OVERDUE no vuelve a matchear, así que una
/// segunda pasada del barrido no toca nada.
pub fn is_overdue_candidate(rental: &Rental, today: NaiveDate) -> bool {
    rental.status == RentalStatus::Booked
        && rental.end_date < today
        && rental.actual_return_date.is_none()
}

pub struct SweeperService {
    pool: PgPool,
    payments: PaymentRepository,
    rentals: RentalRepository,
    cars: CarRepository,
    users: UserRepository,
    notifier: Notifier,
}

impl SweeperService {
    pub fn new(pool: PgPool, notifier: Notifier) -> Self {
        Self {
            payments: PaymentRepository::new(pool.clone()),
            rentals: RentalRepository::new(pool.clone()),
            cars: CarRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            pool,
            notifier,
        }
    }

    /// Expirar pagos PENDING más viejos que el umbral y notificar cada uno
    pub async fn expire_pending_payments(&self) -> Result<u64, AppError> {
        let cutoff = expiry_cutoff(Utc::now());
        let expired = self.payments.expire_older_than(cutoff).await?;

        for payment in &expired {
            if let Err(e) = self.notify_expired(payment).await {
                log::warn!("⚠️ No se pudo notificar el pago expirado {}: {}", payment.id, e);
            }
        }

        if !expired.is_empty() {
            log::info!("⏳ {} pagos expirados", expired.len());
        }

        Ok(expired.len() as u64)
    }

    async fn notify_expired(&self, payment: &Payment) -> Result<(), AppError> {
        let rental = self
            .rentals
            .find_by_id(payment.rental_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Rental not found".to_string()))?;
        let car = self
            .cars
            .find_by_id(rental.car_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;
        let user = self
            .users
            .find_by_id(rental.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        self.notifier
            .send(notification_service::message_expired_payment(
                payment, &car, &user.email,
            ));

        Ok(())
    }

    /// Marcar OVERDUE las reservas BOOKED vencidas sin devolución
    pub async fn flag_overdue_rentals(&self) -> Result<u64, AppError> {
        let today = Utc::now().date_naive();
        let candidates = self.rentals.find_overdue_candidates(today).await?;

        let mut flagged = 0u64;

        for rental in candidates
            .into_iter()
            .filter(|r| is_overdue_candidate(r, today))
        {
            let result = async {
                let mut conn = self.pool.acquire().await?;
                RentalRepository::update_status(&mut conn, rental.id, RentalStatus::Overdue).await
            }
            .await;

            match result {
                Ok(updated) => {
                    flagged += 1;
                    let days_late = (today - updated.end_date).num_days();

                    if let (Ok(Some(car)), Ok(Some(user))) = (
                        self.cars.find_by_id(updated.car_id).await,
                        self.users.find_by_id(updated.user_id).await,
                    ) {
                        self.notifier
                            .send(notification_service::message_overdue_rental(
                                &updated, &car, &user.email, days_late,
                            ));
                    }
                }
                Err(e) => {
                    log::warn!("⚠️ No se pudo marcar OVERDUE el alquiler {}: {}", rental.id, e);
                }
            }
        }

        if flagged > 0 {
            log::info!("⏰ {} alquileres marcados OVERDUE", flagged);
        }

        Ok(flagged)
    }
}

/// Lanzar el scheduler de barridos en background
pub fn spawn_scheduler(pool: PgPool, notifier: Notifier, config: Arc<EnvironmentConfig>) {
    let interval_secs = config.sweep_interval_secs;

    tokio::spawn(async move {
        let sweeper = SweeperService::new(pool, notifier);
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));

        log::info!("🧹 Scheduler de barridos cada {}s", interval_secs);

        loop {
            interval.tick().await;

            if let Err(e) = sweeper.expire_pending_payments().await {
                log::error!("❌ Barrido de pagos falló: {}", e);
            }
            if let Err(e) = sweeper.flag_overdue_rentals().await {
                log::error!("❌ Barrido de alquileres falló: {}", e);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn rental(status: RentalStatus, end: &str, returned: Option<&str>) -> Rental {
        Rental {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            car_id: Uuid::new_v4(),
            start_date: "2025-06-01".parse().unwrap(),
            end_date: end.parse().unwrap(),
            actual_return_date: returned.map(|d| d.parse().unwrap()),
            status,
            created_at: Utc::now(),
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_expiry_cutoff_is_payment_lifetime() {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
        let cutoff = expiry_cutoff(now);

        // Creado hace 25 horas: caduca. Hace 23: sigue vivo.
        assert!(now - Duration::hours(25) < cutoff);
        assert!(now - Duration::hours(23) > cutoff);
    }

    #[test]
    fn test_overdue_candidate_past_end_without_return() {
        let r = rental(RentalStatus::Booked, "2025-06-03", None);
        assert!(is_overdue_candidate(&r, date("2025-06-04")));
    }

    #[test]
    fn test_end_date_today_is_not_overdue() {
        let r = rental(RentalStatus::Booked, "2025-06-03", None);
        assert!(!is_overdue_candidate(&r, date("2025-06-03")));
    }

    #[test]
    fn test_returned_rental_is_not_candidate() {
        let r = rental(RentalStatus::Booked, "2025-06-03", Some("2025-06-03"));
        assert!(!is_overdue_candidate(&r, date("2025-06-04")));
    }

    #[test]
    fn test_second_sweep_finds_nothing_to_flag() {
        // Tras la primera pasada el alquiler ya es OVERDUE
        let r = rental(RentalStatus::Overdue, "2025-06-03", None);
        assert!(!is_overdue_candidate(&r, date("2025-06-04")));
    }
}
