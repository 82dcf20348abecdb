//! Repositorio de Cars
//!
//! Acceso a datos de coches, incluida la anotación de disponibilidad
//! (inventario menos reservas solapadas) usada por el listado del catálogo.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::car::{Car, FuelType};
use crate::utils::errors::AppError;

/// Car anotado con las unidades libres para el rango consultado
#[derive(Debug, Clone, FromRow)]
pub struct CarWithAvailability {
    #[sqlx(flatten)]
    pub car: Car,
    pub cars_available: i64,
}

/// Filtros del listado de coches
///
/// El query se compila explícitamente a partir de estos campos; no hay
/// ningún objeto de filtro compartido que se mute en tiempo de request.
#[derive(Debug, Default, Clone)]
pub struct CarFilter {
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

pub struct CarRepository {
    pool: PgPool,
}

impl CarRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        brand: String,
        model: String,
        year: i32,
        fuel_type: FuelType,
        daily_rate: Decimal,
        inventory: i32,
        image_url: Option<String>,
    ) -> Result<Car, AppError> {
        let car = sqlx::query_as::<_, Car>(
            r#"
            INSERT INTO cars (id, brand, model, year, fuel_type, daily_rate, inventory, image_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(brand)
        .bind(model)
        .bind(year)
        .bind(fuel_type)
        .bind(daily_rate)
        .bind(inventory)
        .bind(image_url)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(car)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Car>, AppError> {
        let car = sqlx::query_as::<_, Car>("SELECT * FROM cars WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(car)
    }

    /// Listar coches con la anotación cars_available
    ///
    /// Sin rango de fechas la disponibilidad es el inventario tal cual.
    /// Con rango, se restan las reservas BOOKED que solapan el intervalo
    /// (solape inclusivo: existing.start <= end AND existing.end >= start)
    /// y el resultado se recorta a cero.
    pub async fn list(&self, filter: &CarFilter) -> Result<Vec<CarWithAvailability>, AppError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM (SELECT c.*, ");

        match (filter.start_date, filter.end_date) {
            (Some(start), Some(end)) => {
                qb.push(
                    "GREATEST(c.inventory - (SELECT COUNT(*) FROM rentals r \
                     WHERE r.car_id = c.id AND r.status = 'BOOKED' \
                     AND r.start_date <= ",
                );
                qb.push_bind(end);
                qb.push(" AND r.end_date >= ");
                qb.push_bind(start);
                qb.push("), 0) AS cars_available");
            }
            _ => {
                qb.push("c.inventory::BIGINT AS cars_available");
            }
        }

        qb.push(" FROM cars c WHERE TRUE");

        if let Some(brand) = &filter.brand {
            qb.push(" AND c.brand ILIKE ");
            qb.push_bind(format!("%{}%", brand));
        }
        if let Some(fuel_type) = filter.fuel_type {
            qb.push(" AND c.fuel_type = ");
            qb.push_bind(fuel_type);
        }
        if let Some(price_min) = filter.price_min {
            qb.push(" AND c.daily_rate >= ");
            qb.push_bind(price_min);
        }
        if let Some(price_max) = filter.price_max {
            qb.push(" AND c.daily_rate <= ");
            qb.push_bind(price_max);
        }
        if let Some(min_year) = filter.min_year {
            qb.push(" AND c.year >= ");
            qb.push_bind(min_year);
        }
        if let Some(max_year) = filter.max_year {
            qb.push(" AND c.year <= ");
            qb.push_bind(max_year);
        }

        qb.push(") AS annotated WHERE TRUE");

        // Con fechas se ocultan siempre los coches sin unidades libres;
        // el flag available refina sobre la anotación ya calculada.
        let dates_given = filter.start_date.is_some() && filter.end_date.is_some();
        match filter.available {
            Some(true) => {
                qb.push(" AND cars_available > 0");
            }
            Some(false) => {
                qb.push(" AND cars_available = 0");
            }
            None if dates_given => {
                qb.push(" AND cars_available > 0");
            }
            None => {}
        }

        qb.push(" ORDER BY brand, model");

        let cars = qb
            .build_query_as::<CarWithAvailability>()
            .fetch_all(&self.pool)
            .await?;

        Ok(cars)
    }

    /// Unidades libres de un coche para un rango opcional (recortado a 0)
    pub async fn available_units(
        &self,
        car: &Car,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<i64, AppError> {
        let overlap = match (start_date, end_date) {
            (Some(start), Some(end)) => {
                let (count,): (i64,) = sqlx::query_as(
                    r#"
                    SELECT COUNT(*) FROM rentals
                    WHERE car_id = $1 AND status = 'BOOKED'
                    AND start_date <= $2 AND end_date >= $3
                    "#,
                )
                .bind(car.id)
                .bind(end)
                .bind(start)
                .fetch_one(&self.pool)
                .await?;
                count
            }
            _ => 0,
        };

        Ok(crate::services::availability::available_units(
            car.inventory as i64,
            overlap,
        ))
    }

    pub async fn update(
        &self,
        id: Uuid,
        brand: Option<String>,
        model: Option<String>,
        year: Option<i32>,
        fuel_type: Option<FuelType>,
        daily_rate: Option<Decimal>,
        inventory: Option<i32>,
        image_url: Option<String>,
    ) -> Result<Car, AppError> {
        let current = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;

        let car = sqlx::query_as::<_, Car>(
            r#"
            UPDATE cars
            SET brand = $2, model = $3, year = $4, fuel_type = $5, daily_rate = $6, inventory = $7, image_url = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(brand.unwrap_or(current.brand))
        .bind(model.unwrap_or(current.model))
        .bind(year.unwrap_or(current.year))
        .bind(fuel_type.unwrap_or(current.fuel_type))
        .bind(daily_rate.unwrap_or(current.daily_rate))
        .bind(inventory.unwrap_or(current.inventory))
        .bind(image_url.or(current.image_url))
        .fetch_one(&self.pool)
        .await?;

        Ok(car)
    }

    /// Borrar un coche - semántica PROTECT: bloqueado mientras existan
    /// alquileres que lo referencien
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;

        let (referenced,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM rentals WHERE car_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if referenced {
            return Err(AppError::Conflict(
                "Cannot delete a car that is referenced by rentals".to_string(),
            ));
        }

        sqlx::query("DELETE FROM cars WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
