//! DTOs de requests y responses
//!
//! Separan la forma del API de los modelos de base de datos.

pub mod auth_dto;
pub mod car_dto;
pub mod common;
pub mod payment_dto;
pub mod rental_dto;
