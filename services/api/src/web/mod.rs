pub mod auth;
pub mod extract;
pub mod middleware;
pub mod profile;
pub mod rest;
pub mod session;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiError;

pub use middleware::require_session;
pub use rest::ApiDoc;
pub use session::{SessionCodec, UserSession};
pub use state::AppState;

/// Profile photos arrive inline as data URLs of up to 5 MiB.
const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Builds the complete application router: API routes behind the session gate,
/// Swagger UI, CORS and request tracing.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/api/health", get(rest::health_handler))
        .route("/api/auth/send-otp", post(auth::send_otp_handler))
        .route("/api/auth/verify-otp", post(auth::verify_otp_handler))
        .route("/api/auth/logout", post(auth::logout_handler))
        .route(
            "/api/profile",
            get(profile::get_profile_handler).patch(profile::update_profile_handler),
        )
        .route("/api/profile/stats", get(profile::stats_handler))
        .route("/api/interview", get(rest::list_interviews_handler))
        .route("/api/interview/create", post(rest::create_interview_handler))
        .route("/api/interview/{id}", get(rest::get_interview_handler))
        .route("/api/interview/{id}/message", post(rest::submit_answer_handler))
        .route(
            "/api/interview/{id}/complete",
            post(rest::complete_interview_handler),
        )
        .route(
            "/api/interview/{id}/delete",
            delete(rest::delete_interview_handler),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(not_found_handler)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ))
        .layer(DefaultBodyLimit::max(BODY_LIMIT));

    api.layer(cors_layer(&state.config.cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Pages are served elsewhere; anything unrouted that passes the gate is a 404.
async fn not_found_handler() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, ACCEPT]);
    match origin.parse::<HeaderValue>() {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            warn!("CORS_ORIGIN '{}' is not a valid header value; cross-origin requests are disabled", origin);
            layer
        }
    }
}
