//! crates/interview_core/src/interview.rs
//!
//! Interview lifecycle: creation with the first question, turn-taking on each
//! answer, completion requests, and the owner-scoped reads and deletes.
//!
//! Every operation takes the caller's email and collapses "does not exist" and
//! "belongs to someone else" into `ServiceError::NotFound`.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    Interview, InterviewMode, InterviewStatus, Message, MessageRole, MAX_QUESTIONS, MIN_QUESTIONS,
};
use crate::error::{ServiceError, ServiceResult};
use crate::grading::GradingQueue;
use crate::locks::InterviewLocks;
use crate::ports::{
    DatabaseService, QuestionGenerationService, QuestionRequest, TextToSpeechService,
};

/// Unvalidated interview settings as submitted by a client.
#[derive(Debug, Clone, Default)]
pub struct NewInterview {
    pub job_title: String,
    pub company: String,
    pub location: String,
    pub description: Option<String>,
    pub max_questions: i64,
    pub mode: String,
}

/// Settings that passed validation.
#[derive(Debug, Clone)]
struct InterviewConfig {
    job_title: String,
    company: String,
    location: String,
    description: Option<String>,
    max_questions: u8,
    mode: InterviewMode,
}

impl NewInterview {
    fn validate(self) -> ServiceResult<InterviewConfig> {
        let required = [&self.job_title, &self.company, &self.location, &self.mode];
        if required.iter().any(|field| field.trim().is_empty()) || self.max_questions == 0 {
            return Err(ServiceError::Validation("Missing required fields".to_string()));
        }
        if !(MIN_QUESTIONS as i64..=MAX_QUESTIONS as i64).contains(&self.max_questions) {
            return Err(ServiceError::Validation(format!(
                "maxQuestions must be between {} and {}",
                MIN_QUESTIONS, MAX_QUESTIONS
            )));
        }
        let mode = self.mode.parse::<InterviewMode>().map_err(|_| {
            ServiceError::Validation("mode must be either 'speech' or 'text'".to_string())
        })?;

        Ok(InterviewConfig {
            job_title: self.job_title.trim().to_string(),
            company: self.company.trim().to_string(),
            location: self.location.trim().to_string(),
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            max_questions: self.max_questions as u8,
            mode,
        })
    }
}

/// A question as delivered to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub text: String,
    /// Base64 WAV audio, present only for speech interviews.
    pub audio_base64: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreatedInterview {
    pub interview_id: Uuid,
    pub first_question: Question,
}

/// What happened after an answer was recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    NextQuestion(Question),
    Completed,
}

/// Encodes synthesized audio for transport.
pub type AudioEncoder = fn(&[u8]) -> String;

#[derive(Clone)]
pub struct InterviewService {
    db: Arc<dyn DatabaseService>,
    questions: Arc<dyn QuestionGenerationService>,
    speech: Arc<dyn TextToSpeechService>,
    grading: GradingQueue,
    locks: Arc<InterviewLocks>,
    encode_audio: AudioEncoder,
}

impl InterviewService {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        questions: Arc<dyn QuestionGenerationService>,
        speech: Arc<dyn TextToSpeechService>,
        grading: GradingQueue,
        locks: Arc<InterviewLocks>,
        encode_audio: AudioEncoder,
    ) -> Self {
        Self {
            db,
            questions,
            speech,
            grading,
            locks,
            encode_audio,
        }
    }

    //=====================================================================================
    // Creation
    //=====================================================================================

    /// Validates the settings, generates the first question, then persists the
    /// interview and that question. Nothing is written if generation fails.
    pub async fn create(&self, owner: &str, new: NewInterview) -> ServiceResult<CreatedInterview> {
        let config = new.validate()?;

        let request = QuestionRequest {
            job_title: config.job_title.clone(),
            company: config.company.clone(),
            description: config.description.clone(),
            history: Vec::new(),
            question_number: 1,
            max_questions: config.max_questions as usize,
        };
        let text = self.questions.generate_question(&request).await?;
        let audio_base64 = self.speak(config.mode, &text).await;

        let interview = Interview {
            id: Uuid::new_v4(),
            user_id: owner.to_string(),
            job_title: config.job_title,
            company: config.company,
            location: config.location,
            description: config.description,
            max_questions: config.max_questions,
            mode: config.mode,
            status: InterviewStatus::InProgress,
            grade: None,
            feedback: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        self.db.create_interview(&interview).await?;
        self.db
            .append_message(&Message::new(interview.id, MessageRole::Assistant, text.clone()))
            .await?;

        info!(
            "Created interview {} for {} ({} questions, {} mode)",
            interview.id, owner, interview.max_questions, interview.mode
        );
        Ok(CreatedInterview {
            interview_id: interview.id,
            first_question: Question { text, audio_base64 },
        })
    }

    //=====================================================================================
    // Turn-Taking
    //=====================================================================================

    /// Records an answer and either asks the next question or finishes the interview.
    ///
    /// The interview ends once `max_questions` questions have been asked and answered:
    /// the final answer is stored but never triggers another question. A second
    /// submission racing on the same interview is rejected with `Conflict`.
    pub async fn submit_answer(
        &self,
        owner: &str,
        interview_id: Uuid,
        content: &str,
    ) -> ServiceResult<TurnOutcome> {
        if content.trim().is_empty() {
            return Err(ServiceError::Validation("Content is required".to_string()));
        }

        let _guard = self.locks.try_acquire(interview_id).ok_or_else(|| {
            ServiceError::Conflict("Another answer is already being processed".to_string())
        })?;

        let interview = self.load_owned(owner, interview_id).await?;
        if interview.status.is_terminal() {
            return Err(ServiceError::Conflict(format!(
                "Interview is already {}",
                interview.status
            )));
        }

        self.db
            .append_message(&Message::new(interview_id, MessageRole::User, content))
            .await?;

        let messages = self.db.get_messages(interview_id).await?;
        let questions_asked = messages
            .iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .count();

        if questions_asked >= interview.max_questions as usize {
            self.db
                .mark_interview_completed(interview_id, Utc::now())
                .await?;
            info!(
                "Interview {} completed after {} questions",
                interview_id, questions_asked
            );
            return Ok(TurnOutcome::Completed);
        }

        let request = QuestionRequest {
            job_title: interview.job_title.clone(),
            company: interview.company.clone(),
            description: interview.description.clone(),
            history: messages.iter().map(|m| m.to_turn()).collect(),
            question_number: questions_asked + 1,
            max_questions: interview.max_questions as usize,
        };
        let text = self.questions.generate_question(&request).await?;
        let audio_base64 = self.speak(interview.mode, &text).await;

        self.db
            .append_message(&Message::new(interview_id, MessageRole::Assistant, text.clone()))
            .await?;

        Ok(TurnOutcome::NextQuestion(Question { text, audio_base64 }))
    }

    /// Queues grading for the interview and returns at once; the outcome lands on
    /// the record later.
    pub async fn complete(&self, owner: &str, interview_id: Uuid) -> ServiceResult<()> {
        self.load_owned(owner, interview_id).await?;
        self.grading.enqueue(interview_id)?;
        info!("Queued grading for interview {}", interview_id);
        Ok(())
    }

    //=====================================================================================
    // Reads and Deletes
    //=====================================================================================

    pub async fn get_with_messages(
        &self,
        owner: &str,
        interview_id: Uuid,
    ) -> ServiceResult<(Interview, Vec<Message>)> {
        let interview = self.load_owned(owner, interview_id).await?;
        let messages = self.db.get_messages(interview_id).await?;
        Ok((interview, messages))
    }

    pub async fn list(&self, owner: &str, limit: usize) -> ServiceResult<Vec<Interview>> {
        Ok(self.db.list_interviews_by_user(owner, limit).await?)
    }

    pub async fn delete(&self, owner: &str, interview_id: Uuid) -> ServiceResult<()> {
        let _guard = self.locks.try_acquire(interview_id).ok_or_else(|| {
            ServiceError::Conflict("Interview is busy, try again".to_string())
        })?;
        self.load_owned(owner, interview_id).await?;
        self.db.delete_interview(interview_id).await?;
        info!("Deleted interview {} for {}", interview_id, owner);
        Ok(())
    }

    async fn load_owned(&self, owner: &str, interview_id: Uuid) -> ServiceResult<Interview> {
        let interview = self
            .db
            .get_interview(interview_id)
            .await
            .map_err(ServiceError::from_lookup)?;
        if !interview.is_owned_by(owner) {
            return Err(ServiceError::NotFound);
        }
        Ok(interview)
    }

    /// Best effort: a failed or empty synthesis just means no audio.
    async fn speak(&self, mode: InterviewMode, text: &str) -> Option<String> {
        if mode != InterviewMode::Speech {
            return None;
        }
        match self.speech.generate_audio(text).await {
            Ok(audio) if !audio.is_empty() => Some((self.encode_audio)(&audio)),
            Ok(_) => None,
            Err(e) => {
                warn!("Speech synthesis failed, sending question without audio: {}", e);
                None
            }
        }
    }
}
