//! crates/interview_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Smallest question budget an interview may be configured with.
pub const MIN_QUESTIONS: u8 = 2;
/// Largest question budget an interview may be configured with.
pub const MAX_QUESTIONS: u8 = 5;

/// How long an issued one-time code stays valid.
pub fn otp_ttl() -> Duration {
    Duration::minutes(10)
}

// Represents a user - identified by email everywhere in the app
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub email: String,
    pub name: Option<String>,
    pub profile_photo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The name shown to the user: the stored name, or the local part of the email.
    pub fn display_name(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => local_part(&self.email).to_string(),
        }
    }
}

/// Returns the part of an email address before the `@`.
pub fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// Optional profile fields a user may change.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub profile_photo: Option<String>,
}

/// A one-time code proving ownership of an email address.
#[derive(Debug, Clone)]
pub struct OtpCredential {
    pub id: Uuid,
    pub email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub verified: bool,
}

impl OtpCredential {
    /// Whether this credential would accept `code` at `now`.
    pub fn accepts(&self, email: &str, code: &str, now: DateTime<Utc>) -> bool {
        !self.verified && self.email == email && self.code == code && self.expires_at > now
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterviewStatus {
    InProgress,
    Completed,
    EndedEarly,
}

impl InterviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::InProgress => "in_progress",
            InterviewStatus::Completed => "completed",
            InterviewStatus::EndedEarly => "ended_early",
        }
    }

    /// `Completed` and `EndedEarly` never transition further.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, InterviewStatus::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterviewMode {
    Speech,
    Text,
}

impl InterviewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewMode::Speech => "speech",
            InterviewMode::Text => "text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    Assistant,
    User,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::Assistant => "assistant",
            MessageRole::User => "user",
        }
    }
}

/// Error returned when a stored enum value is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for InterviewStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(InterviewStatus::InProgress),
            "completed" => Ok(InterviewStatus::Completed),
            "ended_early" => Ok(InterviewStatus::EndedEarly),
            other => Err(ParseEnumError {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for InterviewMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "speech" => Ok(InterviewMode::Speech),
            "text" => Ok(InterviewMode::Text),
            other => Err(ParseEnumError {
                kind: "mode",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for MessageRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assistant" => Ok(MessageRole::Assistant),
            "user" => Ok(MessageRole::User),
            other => Err(ParseEnumError {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for InterviewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mock interview owned by a single user.
#[derive(Debug, Clone, PartialEq)]
pub struct Interview {
    pub id: Uuid,
    /// Owner's email.
    pub user_id: String,
    pub job_title: String,
    pub company: String,
    pub location: String,
    pub description: Option<String>,
    pub max_questions: u8,
    pub mode: InterviewMode,
    pub status: InterviewStatus,
    pub grade: Option<u8>,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Interview {
    pub fn is_owned_by(&self, email: &str) -> bool {
        self.user_id == email
    }
}

/// A single turn (question or answer) stored in an interview's log.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(interview_id: Uuid, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            interview_id,
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn to_turn(&self) -> Turn {
        Turn {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// The role/content view of a message handed to the AI collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: MessageRole,
    pub content: String,
}

/// What the grading collaborator returns. `grade` is not trusted to be in range.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeReport {
    pub grade: i64,
    pub feedback: String,
}

/// The final outcome written to an interview in one update.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeRecord {
    pub status: InterviewStatus,
    pub grade: u8,
    pub feedback: String,
    pub completed_at: DateTime<Utc>,
}

/// Aggregates over a user's completed interviews.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserStats {
    pub total_interviews: i64,
    pub average_grade: f64,
    pub highest_grade: i64,
    pub lowest_grade: i64,
}
