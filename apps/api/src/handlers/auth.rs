use axum::extract::{Form, State};
use axum::Json;
use keyfort_core::AppError;

use crate::dto::{LoginForm, LoginResponse, RegisterRequest, RegisterResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// POST /api/v1/auth/register - Create a new identity.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<Json<RegisterResponse>> {
    let user = state
        .user_service
        .register(&payload.email, &payload.password)
        .await?;

    tracing::info!(user_id = %user.id, "user registered");

    Ok(Json(RegisterResponse {
        id: user.id.as_uuid(),
        email: user.email,
    }))
}

/// POST /api/v1/auth/login - Authenticate and issue a session token.
///
/// Form-encoded; `username` carries the email per the OAuth2 password
/// grant convention the original surface followed.
pub async fn login_handler(
    State(state): State<AppState>,
    Form(payload): Form<LoginForm>,
) -> ApiResult<Json<LoginResponse>> {
    if payload.grant_type != "password" {
        return Err(AppError::Validation(
            "unsupported grant type, must be 'password'".to_owned(),
        )
        .into());
    }

    let user = state
        .user_service
        .login(&payload.username, &payload.password)
        .await?;

    let session = state.credential_service.issue_session(user.id)?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(LoginResponse {
        access_token: session.token,
        token_type: "bearer",
        expires_at: session.expires_at,
    }))
}
