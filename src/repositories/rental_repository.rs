//! Repositorio de Rentals
//!
//! Las operaciones del camino de reserva (bloqueo del coche, conteo de
//! solapes, inserción) toman la conexión de la transacción en curso;
//! el resto trabaja sobre el pool.

use chrono::{NaiveDate, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::car::Car;
use crate::models::rental::{Rental, RentalStatus};
use crate::utils::errors::AppError;

/// Filtros del listado de alquileres
#[derive(Debug, Default, Clone)]
pub struct RentalFilter {
    /// Solo staff puede consultar alquileres de otros usuarios
    pub user_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub status: Option<RentalStatus>,
}

pub struct RentalRepository {
    pool: PgPool,
}

impl RentalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Bloquear la fila del coche antes de contar solapes
    ///
    /// Serializa las reservas concurrentes sobre el mismo coche: dos
    /// transacciones que compitan por la última unidad ven el conteo
    /// una después de la otra.
    pub async fn lock_car(conn: &mut PgConnection, car_id: Uuid) -> Result<Option<Car>, AppError> {
        let car = sqlx::query_as::<_, Car>("SELECT * FROM cars WHERE id = $1 FOR UPDATE")
            .bind(car_id)
            .fetch_optional(conn)
            .await?;

        Ok(car)
    }

    /// Reservas BOOKED del coche que solapan el rango (ambos extremos inclusive)
    pub async fn count_overlapping_booked(
        conn: &mut PgConnection,
        car_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM rentals
            WHERE car_id = $1 AND status = 'BOOKED'
            AND start_date <= $2 AND end_date >= $3
            "#,
        )
        .bind(car_id)
        .bind(end_date)
        .bind(start_date)
        .fetch_one(conn)
        .await?;

        Ok(count)
    }

    /// Alquileres activos (BOOKED u OVERDUE) del usuario
    pub async fn count_active_for_user(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM rentals WHERE user_id = $1 AND status IN ('BOOKED', 'OVERDUE')",
        )
        .bind(user_id)
        .fetch_one(conn)
        .await?;

        Ok(count)
    }

    pub async fn insert(
        conn: &mut PgConnection,
        user_id: Uuid,
        car_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Rental, AppError> {
        let rental = sqlx::query_as::<_, Rental>(
            r#"
            INSERT INTO rentals (id, user_id, car_id, start_date, end_date, actual_return_date, status, created_at)
            VALUES ($1, $2, $3, $4, $5, NULL, 'BOOKED', $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(car_id)
        .bind(start_date)
        .bind(end_date)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        Ok(rental)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Rental>, AppError> {
        let rental = sqlx::query_as::<_, Rental>("SELECT * FROM rentals WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(rental)
    }

    /// Variante con bloqueo de fila, para la liquidación de pagos
    pub async fn find_by_id_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Rental>, AppError> {
        let rental = sqlx::query_as::<_, Rental>("SELECT * FROM rentals WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(rental)
    }

    /// Listado con ámbito de autorización compilado en la query
    ///
    /// El user_id del filtro lo fija el caller según el rol: para un
    /// usuario normal siempre es el suyo propio.
    pub async fn list(&self, filter: &RentalFilter) -> Result<Vec<Rental>, AppError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM rentals WHERE TRUE");

        if let Some(user_id) = filter.user_id {
            qb.push(" AND user_id = ");
            qb.push_bind(user_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ");
            qb.push_bind(status);
        }
        match filter.is_active {
            Some(true) => {
                qb.push(" AND status IN ('BOOKED', 'OVERDUE')");
            }
            Some(false) => {
                qb.push(" AND status IN ('COMPLETED', 'CANCELLED')");
            }
            None => {}
        }

        qb.push(" ORDER BY created_at DESC");

        let rentals = qb
            .build_query_as::<Rental>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rentals)
    }

    pub async fn update_status(
        conn: &mut PgConnection,
        id: Uuid,
        status: RentalStatus,
    ) -> Result<Rental, AppError> {
        let rental = sqlx::query_as::<_, Rental>(
            "UPDATE rentals SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_one(conn)
        .await?;

        Ok(rental)
    }

    pub async fn set_return_date(
        conn: &mut PgConnection,
        id: Uuid,
        actual_return_date: NaiveDate,
    ) -> Result<Rental, AppError> {
        let rental = sqlx::query_as::<_, Rental>(
            "UPDATE rentals SET actual_return_date = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(actual_return_date)
        .fetch_one(conn)
        .await?;

        Ok(rental)
    }

    /// Reservas BOOKED sin devolución cuya fecha de fin ya pasó
    pub async fn find_overdue_candidates(&self, today: NaiveDate) -> Result<Vec<Rental>, AppError> {
        let rentals = sqlx::query_as::<_, Rental>(
            "SELECT * FROM rentals WHERE status = 'BOOKED' AND end_date < $1 AND actual_return_date IS NULL",
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        Ok(rentals)
    }
}
