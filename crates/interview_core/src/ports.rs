//! crates/interview_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    GradeRecord, GradeReport, Interview, Message, OtpCredential, ProfileUpdate, Turn, User,
    UserStats,
};

#[cfg(test)]
use mockall::automock;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users ---
    /// Inserts the user if absent and bumps `updated_at` otherwise.
    /// The flag is `true` when the row was newly created.
    async fn upsert_user(&self, email: &str) -> PortResult<(User, bool)>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<User>;

    async fn update_user_profile(&self, email: &str, update: &ProfileUpdate) -> PortResult<User>;

    // --- One-time codes ---
    async fn save_otp(&self, credential: &OtpCredential) -> PortResult<()>;

    /// Atomically flips a matching, unverified, unexpired credential to verified.
    /// Returns `false` when nothing matched.
    async fn consume_otp(&self, email: &str, code: &str, now: DateTime<Utc>) -> PortResult<bool>;

    // --- Interviews ---
    async fn create_interview(&self, interview: &Interview) -> PortResult<()>;

    async fn get_interview(&self, interview_id: Uuid) -> PortResult<Interview>;

    /// Newest first.
    async fn list_interviews_by_user(&self, user_id: &str, limit: usize)
        -> PortResult<Vec<Interview>>;

    async fn mark_interview_completed(
        &self,
        interview_id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn record_grade(&self, interview_id: Uuid, record: &GradeRecord) -> PortResult<()>;

    /// Removes the interview and every message that belongs to it.
    async fn delete_interview(&self, interview_id: Uuid) -> PortResult<()>;

    async fn get_user_stats(&self, user_id: &str) -> PortResult<UserStats>;

    // --- Message log ---
    async fn append_message(&self, message: &Message) -> PortResult<()>;

    /// Ordered by timestamp ascending.
    async fn get_messages(&self, interview_id: Uuid) -> PortResult<Vec<Message>>;
}

/// Everything the interviewer needs to phrase the next question.
#[derive(Debug, Clone)]
pub struct QuestionRequest {
    pub job_title: String,
    pub company: String,
    pub description: Option<String>,
    pub history: Vec<Turn>,
    pub question_number: usize,
    pub max_questions: usize,
}

impl QuestionRequest {
    pub fn is_last_question(&self) -> bool {
        self.question_number == self.max_questions
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait QuestionGenerationService: Send + Sync {
    /// Produces the text of the next interview question.
    async fn generate_question(&self, request: &QuestionRequest) -> PortResult<String>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait TextToSpeechService: Send + Sync {
    /// Generates audio data from a string of text. An empty vector means no audio.
    async fn generate_audio(&self, text: &str) -> PortResult<Vec<u8>>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait GradingService: Send + Sync {
    /// Scores a full transcript.
    async fn grade_interview(
        &self,
        transcript: &[Turn],
        job_title: &str,
        company: &str,
    ) -> PortResult<GradeReport>;
}

/// A rendered email ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait MailService: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> PortResult<()>;
}
