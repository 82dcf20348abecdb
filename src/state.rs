//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum: pool de Postgres, configuración, cliente
//! de Stripe y el handle del worker de notificaciones.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::environment::EnvironmentConfig;
use crate::services::notification_service::Notifier;
use crate::services::stripe::StripeClient;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<EnvironmentConfig>,
    pub stripe: Arc<StripeClient>,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(pool: PgPool, config: EnvironmentConfig, notifier: Notifier) -> Self {
        let stripe = Arc::new(StripeClient::new(&config));

        Self {
            pool,
            config: Arc::new(config),
            stripe,
            notifier,
        }
    }
}
