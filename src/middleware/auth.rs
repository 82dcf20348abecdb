//! Middleware de autenticación JWT
//!
//! Valida el token Bearer, comprueba que el usuario sigue existiendo e
//! inyecta AuthenticatedUser en las extensions de la request. El flag
//! is_staff se relee de la base de datos, no del token.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
    Extension,
};
use uuid::Uuid;

use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::jwt::{extract_token_from_header, verify_token};

/// Usuario autenticado que se inyecta en las requests
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub is_staff: bool,
}

/// Middleware de autenticación JWT
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|auth_str| auth_str.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Authorization token required".to_string()))?;

    let token = extract_token_from_header(auth_header)?;

    let claims = verify_token(token, &state.config)?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".to_string()))?;

    // El usuario debe seguir existiendo
    let user: Option<(Uuid, bool)> =
        sqlx::query_as("SELECT id, is_staff FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&state.pool)
            .await?;

    let (user_id, is_staff) =
        user.ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { user_id, is_staff });

    Ok(next.run(request).await)
}

/// Middleware que restringe una ruta a usuarios staff
///
/// Debe colgarse por dentro de auth_middleware.
pub async fn staff_middleware(
    Extension(user): Extension<AuthenticatedUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !user.is_staff {
        return Err(AppError::Forbidden("Staff access required".to_string()));
    }

    Ok(next.run(request).await)
}
