mod config;
mod controllers;
mod database;
mod dto;
mod middleware;
mod models;
mod repositories;
mod routes;
mod services;
mod state;
mod utils;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use dotenvy::dotenv;
use serde_json::json;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};

use config::environment::EnvironmentConfig;
use middleware::cors::cors_middleware;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    let config = EnvironmentConfig::default();

    // Configurar logging
    let log_level = if config.is_development() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    info!("🚗 Car Rental API");
    info!("=================");

    // Inicializar base de datos
    let pool = match database::create_pool(None).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("❌ Error conectando a la base de datos: {}", e);
            return Err(anyhow::anyhow!("Error de base de datos: {}", e));
        }
    };

    // Worker de notificaciones y estado compartido
    let notifier = services::notification_service::spawn_telegram_worker(&config);
    let app_state = AppState::new(pool.clone(), config, notifier.clone());

    // Barridos periódicos (expirar pagos, marcar OVERDUE)
    services::sweeper_service::spawn_scheduler(pool, notifier, app_state.config.clone());

    let app = Router::new()
        .route("/test", get(test_endpoint))
        .nest(
            "/api/auth",
            routes::auth_routes::create_auth_router(app_state.clone()),
        )
        .nest(
            "/api/cars",
            routes::car_routes::create_car_router(app_state.clone()),
        )
        .nest(
            "/api/rentals",
            routes::rental_routes::create_rental_router(app_state.clone()),
        )
        .nest(
            "/api/payments",
            routes::payment_routes::create_payment_router(app_state.clone()),
        )
        .layer(cors_middleware())
        .with_state(app_state.clone());

    let addr: SocketAddr = app_state.config.server_url().parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /test - Endpoint de prueba");
    info!("👤 Auth:");
    info!("   POST /api/auth/register - Registrar usuario");
    info!("   POST /api/auth/login - Login");
    info!("   GET  /api/auth/me - Usuario actual");
    info!("🚙 Cars:");
    info!("   GET  /api/cars - Listar coches (filtros + disponibilidad)");
    info!("   GET  /api/cars/:id - Detalle de coche");
    info!("   POST /api/cars - Crear coche (staff)");
    info!("   PUT  /api/cars/:id - Actualizar coche (staff)");
    info!("   DELETE /api/cars/:id - Eliminar coche (staff)");
    info!("📋 Rentals:");
    info!("   POST /api/rentals - Crear reserva");
    info!("   GET  /api/rentals - Listar alquileres");
    info!("   GET  /api/rentals/:id - Detalle con pagos");
    info!("   POST /api/rentals/:id/return - Devolver coche");
    info!("   POST /api/rentals/:id/cancel - Cancelar reserva");
    info!("💳 Payments:");
    info!("   POST /api/payments/webhook - Webhook de Stripe");
    info!("   GET  /api/payments/success - Landing de éxito");
    info!("   GET  /api/payments/cancel - Landing de cancelación");
    info!("   GET  /api/payments - Listar pagos");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Servidor terminado");
    Ok(())
}

/// Endpoint de prueba simple
async fn test_endpoint() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Car Rental API funcionando correctamente",
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal SIGTERM recibida, apagando servidor...");
        },
    }
}
