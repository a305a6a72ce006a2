//! services/api/src/web/auth.rs
//!
//! Passwordless login: email one-time codes, session cookie issuance, logout.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Redirect},
    Json,
};
use interview_core::notifications::welcome_email;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::web::extract::ApiJson;
use crate::web::rest::SuccessResponse;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SendOtpRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Deserialize, ToSchema)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/send-otp - Email a one-time login code
#[utoipa::path(
    post,
    path = "/api/auth/send-otp",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "Code sent", body = SuccessResponse),
        (status = 400, description = "Invalid email", body = crate::error::ErrorBody),
        (status = 500, description = "Delivery failed", body = crate::error::ErrorBody)
    )
)]
pub async fn send_otp_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SendOtpRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.otp.send_code(req.email.trim()).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// POST /api/auth/verify-otp - Exchange a code for a session cookie
#[utoipa::path(
    post,
    path = "/api/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Signed in; session cookie set", body = SuccessResponse),
        (status = 400, description = "Missing fields or invalid/expired code", body = crate::error::ErrorBody)
    )
)]
pub async fn verify_otp_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<VerifyOtpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim();
    let code = req.otp.trim();
    if email.is_empty() || code.is_empty() {
        return Err(ApiError::BadRequest("Email and OTP are required".to_string()));
    }

    if !state.otp.verify(email, code).await? {
        return Err(ApiError::BadRequest("Invalid or expired OTP".to_string()));
    }

    let (user, created) = state.db.upsert_user(email).await?;
    let token = state
        .sessions
        .issue(&user.email, Some(&user.display_name()))
        .map_err(|e| ApiError::Internal(format!("Failed to sign session: {}", e)))?;

    if created {
        info!("New user signed up: {}", user.email);
        let mailer = state.mailer.clone();
        let message = welcome_email(&user.email, &user.display_name());
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&message).await {
                warn!("Welcome email to {} failed: {}", message.to, e);
            }
        });
    }

    Ok((
        [(header::SET_COOKIE, state.sessions.session_cookie(&token))],
        Json(SuccessResponse::ok()),
    ))
}

/// POST /api/auth/logout - Clear the session and go home
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 303, description = "Session cleared; redirect to /")
    )
)]
pub async fn logout_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, state.sessions.clear_cookie())],
        Redirect::to("/"),
    )
}
