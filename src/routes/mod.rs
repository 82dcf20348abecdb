//! Definición de rutas
//!
//! Un router por recurso; main.rs los anida bajo /api.

pub mod auth_routes;
pub mod car_routes;
pub mod payment_routes;
pub mod rental_routes;
