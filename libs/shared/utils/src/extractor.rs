use std::sync::Arc;

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
    body::Body,
};
use uuid::Uuid;

use shared_models::auth::{Caller, Role, User};
use shared_models::error::AppError;
use shared_config::AppConfig;

use crate::jwt::validate_token;

// Validates the bearer token and stores the caller in request extensions
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    let token = auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

    let user = validate_token(token, &config.supabase_jwt_secret)
        .map_err(|e| AppError::Auth(e.to_string()))?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// The caller's id as a UUID. Supabase subjects are always UUIDs.
pub fn caller_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Token subject is not a valid user id".to_string()))
}

/// The caller's clinic role, or `Forbidden` if the token carries none.
pub fn caller_role(user: &User) -> Result<Role, AppError> {
    user.clinic_role()
        .ok_or_else(|| AppError::Forbidden("No clinic role assigned to this account".to_string()))
}

pub fn require_role(user: &User, allowed: &[Role]) -> Result<Role, AppError> {
    let role = caller_role(user)?;
    if allowed.contains(&role) {
        Ok(role)
    } else {
        Err(AppError::Forbidden(format!("Role {} may not perform this action", role)))
    }
}

pub fn caller(user: &User) -> Result<Caller, AppError> {
    Ok(Caller::new(caller_id(user)?, caller_role(user)?))
}
