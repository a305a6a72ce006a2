//! services/api/src/web/profile.rs
//!
//! Profile read/update and per-user interview statistics.

use axum::{extract::State, http::header, response::IntoResponse, Extension, Json};
use interview_core::{PortError, ProfileUpdate, User, UserStats};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use crate::error::{ApiError, ErrorBody};
use crate::web::extract::ApiJson;
use crate::web::session::UserSession;
use crate::web::state::AppState;

/// Upper bound on the length of a `data:` URL profile photo.
pub const MAX_PROFILE_PHOTO_LEN: usize = 5 * 1024 * 1024;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub email: String,
    pub name: String,
    pub profile_photo: String,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            name: user.name.unwrap_or_default(),
            profile_photo: user.profile_photo.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub profile_photo: Option<String>,
}

impl UpdateProfileRequest {
    fn validate(self) -> Result<ProfileUpdate, ApiError> {
        if let Some(photo) = self.profile_photo.as_deref().filter(|p| !p.is_empty()) {
            if !photo.starts_with("data:image/") {
                return Err(ApiError::BadRequest(
                    "Profile photo must be a valid base64 image data URL".to_string(),
                ));
            }
            if photo.len() > MAX_PROFILE_PHOTO_LEN {
                return Err(ApiError::BadRequest(
                    "Profile photo is too large (max 5MB)".to_string(),
                ));
            }
        }
        Ok(ProfileUpdate {
            name: self.name,
            profile_photo: self.profile_photo,
        })
    }
}

#[derive(Serialize, ToSchema)]
pub struct UpdateProfileResponse {
    pub message: String,
    pub user: ProfileResponse,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_interviews: i64,
    pub average_grade: f64,
    pub highest_grade: i64,
    pub lowest_grade: i64,
}

impl From<UserStats> for StatsResponse {
    fn from(s: UserStats) -> Self {
        Self {
            total_interviews: s.total_interviews,
            average_grade: s.average_grade,
            highest_grade: s.highest_grade,
            lowest_grade: s.lowest_grade,
        }
    }
}

fn user_lookup(err: PortError) -> ApiError {
    match err {
        PortError::NotFound(_) => ApiError::NotFound("User not found".to_string()),
        other => ApiError::Port(other),
    }
}

/// GET /api/profile
#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 404, description = "User not found", body = ErrorBody)
    )
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = state
        .db
        .get_user_by_email(&session.email)
        .await
        .map_err(user_lookup)?;
    Ok(Json(user.into()))
}

/// PATCH /api/profile - Update name and/or photo; the session is reissued with the new name
#[utoipa::path(
    patch,
    path = "/api/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UpdateProfileResponse),
        (status = 400, description = "Invalid photo", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    )
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let update = req.validate()?;
    let user = state
        .db
        .update_user_profile(&session.email, &update)
        .await
        .map_err(user_lookup)?;

    let token = state
        .sessions
        .issue(&user.email, Some(&user.display_name()))
        .map_err(|e| ApiError::Internal(format!("Failed to sign session: {}", e)))?;
    info!("Updated profile for {}", user.email);

    Ok((
        [(header::SET_COOKIE, state.sessions.session_cookie(&token))],
        Json(UpdateProfileResponse {
            message: "Profile updated successfully".to_string(),
            user: user.into(),
        }),
    ))
}

/// GET /api/profile/stats - Aggregates over completed interviews
#[utoipa::path(
    get,
    path = "/api/profile/stats",
    responses((status = 200, description = "Statistics", body = StatsResponse))
)]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.db.get_user_stats(&session.email).await?;
    Ok(Json(stats.into()))
}
