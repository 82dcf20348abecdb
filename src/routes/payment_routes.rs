use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};

use crate::controllers::payment_controller::PaymentController;
use crate::dto::payment_dto::{PaymentListQuery, PaymentResponse, SuccessQuery};
use crate::middleware::auth::{auth_middleware, AuthenticatedUser};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_payment_router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", get(list_payments))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    // El webhook y las landings de checkout no llevan JWT
    Router::new()
        .route("/webhook", post(stripe_webhook))
        .route("/success", get(payment_success))
        .route("/cancel", get(payment_cancel))
        .merge(protected)
}

fn controller(state: &AppState) -> PaymentController {
    PaymentController::new(
        state.pool.clone(),
        state.stripe.clone(),
        state.notifier.clone(),
        state.config.clone(),
    )
}

async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, AppError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::InvalidSignature("Missing Stripe-Signature header".to_string())
        })?;

    controller(&state).webhook(signature, &body).await?;

    Ok(StatusCode::OK)
}

async fn payment_success(
    State(state): State<AppState>,
    Query(query): Query<SuccessQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let payment = controller(&state).success(&query.session_id).await?;

    Ok(Json(serde_json::json!({
        "detail": "Payment successful",
        "payment": payment,
    })))
}

async fn payment_cancel() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "detail": "Payment was cancelled. You can complete it later — session valid for 24 hours."
    }))
}

async fn list_payments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<PaymentListQuery>,
) -> Result<Json<Vec<PaymentResponse>>, AppError> {
    let response = controller(&state).list(&user, query).await?;
    Ok(Json(response))
}
