//! Servicios de negocio
//!
//! La lógica pura (precios, disponibilidad, decisiones de ciclo de vida)
//! vive en funciones sin IO para poder testearla sin base de datos; los
//! servicios orquestan repositorios, Stripe y notificaciones alrededor.

pub mod availability;
pub mod notification_service;
pub mod payment_service;
pub mod pricing;
pub mod rental_service;
pub mod stripe;
pub mod sweeper_service;
