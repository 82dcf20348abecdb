//! Controladores
//!
//! Reciben DTOs ya deserializados, validan, delegan en repositorios y
//! servicios y devuelven DTOs de respuesta.

pub mod auth_controller;
pub mod car_controller;
pub mod payment_controller;
pub mod rental_controller;
