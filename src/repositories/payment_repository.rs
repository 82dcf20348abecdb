//! Repositorio de Payments

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::payment::{Payment, PaymentStatus, PaymentType};
use crate::utils::errors::AppError;

/// Filtros del listado de pagos
#[derive(Debug, Default, Clone)]
pub struct PaymentFilter {
    /// Solo staff puede consultar pagos de otros usuarios
    pub user_id: Option<Uuid>,
    pub status: Option<PaymentStatus>,
}

pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        rental_id: Uuid,
        payment_type: PaymentType,
        session_id: String,
        session_url: String,
        money_to_pay: Decimal,
    ) -> Result<Payment, AppError> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (id, rental_id, status, payment_type, session_id, session_url, money_to_pay, created_at)
            VALUES ($1, $2, 'PENDING', $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(rental_id)
        .bind(payment_type)
        .bind(session_id)
        .bind(session_url)
        .bind(money_to_pay)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(payment)
    }

    pub async fn find_by_session_id(&self, session_id: &str) -> Result<Option<Payment>, AppError> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(payment)
    }

    pub async fn find_by_rental_id(&self, rental_id: Uuid) -> Result<Vec<Payment>, AppError> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE rental_id = $1 ORDER BY created_at",
        )
        .bind(rental_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Variante con bloqueo de fila, para la reconciliación del webhook
    pub async fn find_by_session_id_for_update(
        conn: &mut PgConnection,
        session_id: &str,
    ) -> Result<Option<Payment>, AppError> {
        let payment = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE session_id = $1 FOR UPDATE",
        )
        .bind(session_id)
        .fetch_optional(conn)
        .await?;

        Ok(payment)
    }

    /// ¿Tiene el usuario algún pago PENDING sobre sus alquileres?
    ///
    /// Guard de la creación de reservas: primero se saldan las deudas.
    pub async fn user_has_pending(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<bool, AppError> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM payments p
                JOIN rentals r ON r.id = p.rental_id
                WHERE r.user_id = $1 AND p.status = 'PENDING'
            )
            "#,
        )
        .bind(user_id)
        .fetch_one(conn)
        .await?;

        Ok(exists)
    }

    pub async fn mark_paid(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Payment, AppError> {
        let payment = sqlx::query_as::<_, Payment>(
            "UPDATE payments SET status = 'PAID' WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(conn)
        .await?;

        Ok(payment)
    }

    /// ¿Quedan otros pagos PENDING del mismo alquiler?
    ///
    /// Decide si la liquidación puede cerrar un alquiler OVERDUE.
    pub async fn rental_has_other_pending(
        conn: &mut PgConnection,
        rental_id: Uuid,
        exclude_payment_id: Uuid,
    ) -> Result<bool, AppError> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM payments
                WHERE rental_id = $1 AND id != $2 AND status = 'PENDING'
            )
            "#,
        )
        .bind(rental_id)
        .bind(exclude_payment_id)
        .fetch_one(conn)
        .await?;

        Ok(exists)
    }

    /// Expirar pagos PENDING más antiguos que el umbral
    ///
    /// Devuelve los pagos afectados para poder notificarlos. Idempotente:
    /// los ya EXPIRED no matchean el filtro.
    pub async fn expire_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Payment>, AppError> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments SET status = 'EXPIRED'
            WHERE status = 'PENDING' AND created_at < $1
            RETURNING *
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Listado con ámbito de autorización compilado en la query
    pub async fn list(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, AppError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT p.* FROM payments p JOIN rentals r ON r.id = p.rental_id WHERE TRUE",
        );

        if let Some(user_id) = filter.user_id {
            qb.push(" AND r.user_id = ");
            qb.push_bind(user_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND p.status = ");
            qb.push_bind(status);
        }

        qb.push(" ORDER BY p.created_at DESC");

        let payments = qb
            .build_query_as::<Payment>()
            .fetch_all(&self.pool)
            .await?;

        Ok(payments)
    }
}
