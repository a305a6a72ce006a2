//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::session::SessionCodec;
use interview_core::{
    ports::{DatabaseService, MailService},
    InterviewService, OtpService,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub sessions: SessionCodec,
    pub otp: OtpService,
    pub interviews: InterviewService,
    pub mailer: Arc<dyn MailService>,
}
