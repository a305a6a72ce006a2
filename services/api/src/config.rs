//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Signing keys shorter than this are refused.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub log_level: Level,
    pub session_secret: String,
    pub secure_cookies: bool,
    pub cors_origin: String,
    pub openai_api_key: String,
    pub question_model: String,
    pub grading_model: String,
    pub tts_voice: String,
    pub mail_api_key: Option<String>,
    pub mail_api_url: String,
    pub mail_from: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let db_max_connections = parse_or("DB_MAX_CONNECTIONS", 5u32)?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Session Settings ---
        let session_secret = std::env::var("SESSION_SECRET")
            .map_err(|_| ConfigError::MissingVar("SESSION_SECRET".to_string()))?;
        if session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(ConfigError::InvalidValue(
                "SESSION_SECRET".to_string(),
                format!("must be at least {} bytes", MIN_SESSION_SECRET_LEN),
            ));
        }
        let secure_cookies = parse_or("SECURE_COOKIES", true)?;
        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Load API Keys ---
        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?;
        let mail_api_key = std::env::var("MAIL_API_KEY").ok();

        // --- Load Adapter-specific Settings ---
        let question_model =
            std::env::var("QUESTION_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let grading_model =
            std::env::var("GRADING_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let tts_voice = std::env::var("TTS_VOICE").unwrap_or_else(|_| "alloy".to_string());
        let mail_api_url = std::env::var("MAIL_API_URL")
            .unwrap_or_else(|_| "https://api.resend.com/emails".to_string());
        let mail_from = std::env::var("MAIL_FROM")
            .unwrap_or_else(|_| "AI Interview Practice <onboarding@resend.dev>".to_string());

        Ok(Self {
            bind_address,
            database_url,
            db_max_connections,
            log_level,
            session_secret,
            secure_cookies,
            cors_origin,
            openai_api_key,
            question_model,
            grading_model,
            tts_voice,
            mail_api_key,
            mail_api_url,
            mail_from,
        })
    }
}

fn parse_or<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(var.to_string(), format!("'{}'", raw))),
        Err(_) => Ok(default),
    }
}
