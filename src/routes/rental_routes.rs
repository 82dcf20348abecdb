use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::controllers::rental_controller::RentalController;
use crate::dto::common::ApiResponse;
use crate::dto::rental_dto::{
    CreateRentalRequest, RentalDetailResponse, RentalListQuery, RentalResponse,
};
use crate::middleware::auth::{auth_middleware, AuthenticatedUser};
use crate::services::rental_service::{CancelOutcome, ReturnOutcome};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_rental_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(create_rental))
        .route("/", get(list_rentals))
        .route("/:id", get(get_rental))
        .route("/:id/return", post(return_car))
        .route("/:id/cancel", post(cancel_rental))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

fn controller(state: &AppState) -> RentalController {
    RentalController::new(
        state.pool.clone(),
        state.stripe.clone(),
        state.notifier.clone(),
        state.config.clone(),
    )
}

async fn create_rental(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateRentalRequest>,
) -> Result<Json<ApiResponse<RentalResponse>>, AppError> {
    let response = controller(&state).create(&user, request).await?;
    Ok(Json(response))
}

async fn list_rentals(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<RentalListQuery>,
) -> Result<Json<Vec<RentalResponse>>, AppError> {
    let response = controller(&state).list(&user, query).await?;
    Ok(Json(response))
}

async fn get_rental(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<RentalDetailResponse>, AppError> {
    let response = controller(&state).get_by_id(&user, id).await?;
    Ok(Json(response))
}

async fn return_car(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReturnOutcome>, AppError> {
    let response = controller(&state).return_car(&user, id).await?;
    Ok(Json(response))
}

async fn cancel_rental(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancelOutcome>, AppError> {
    let response = controller(&state).cancel(&user, id).await?;
    Ok(Json(response))
}
