//! Repositorios de acceso a datos
//!
//! Cada repositorio encapsula las queries SQL de una entidad. Las
//! operaciones que deben ejecutarse dentro de una transacción reciben
//! la conexión explícitamente en lugar de usar el pool.

pub mod car_repository;
pub mod payment_repository;
pub mod rental_repository;
pub mod user_repository;
