//! services/api/src/adapters/grading_llm.rs
//!
//! This module contains the adapter for the grading LLM.
//! It implements the `GradingService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use interview_core::{
    domain::{GradeReport, MessageRole, Turn},
    ports::{GradingService, PortError, PortResult},
};
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

/// Used when the grader forgets the `GRADE:` line.
const FALLBACK_GRADE: i64 = 70;

const SYSTEM_INSTRUCTIONS: &str = "You are an expert interview evaluator. Analyze the \
     interview transcript you are given and provide a grade and detailed feedback.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `GradingService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiGradingAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiGradingAdapter {
    /// Creates a new `OpenAiGradingAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

fn build_prompt(transcript: &[Turn], job_title: &str, company: &str) -> String {
    let conversation = transcript
        .iter()
        .map(|turn| {
            let speaker = match turn.role {
                MessageRole::Assistant => "Interviewer",
                MessageRole::User => "Candidate",
            };
            format!("{}: {}", speaker, turn.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Job Title: {job_title}\n\
         Company: {company}\n\n\
         Interview Transcript:\n{conversation}\n\n\
         Evaluate the candidate based on these criteria (total 100 points):\n\
         1. Clarity (25 points) - How clear and articulate were the responses?\n\
         2. Relevance (25 points) - How well did answers match the questions?\n\
         3. Depth (20 points) - Level of detail and insight provided\n\
         4. Examples (15 points) - Use of specific examples and experiences\n\
         5. Confidence (15 points) - Tone and delivery quality\n\n\
         Provide your response in this exact format:\n\
         GRADE: [number between 0-100]\n\
         FEEDBACK:\n\
         [Detailed paragraph analyzing the interview performance, highlighting strengths \
         and areas for improvement. Be specific and constructive.]"
    )
}

fn grade_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"GRADE:\s*(-?\d+)").expect("static regex"))
}

fn feedback_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)FEEDBACK:\s*(.+)").expect("static regex"))
}

/// Pulls `GRADE:` and `FEEDBACK:` out of the grader's reply.
pub fn parse_grading_response(text: &str) -> GradeReport {
    let grade = grade_regex()
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or_else(|| {
            warn!("Grader reply had no GRADE line; using {}", FALLBACK_GRADE);
            FALLBACK_GRADE
        });
    let feedback = feedback_regex()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| text.trim().to_string());

    GradeReport {
        grade: grade.clamp(0, 100),
        feedback,
    }
}

//=========================================================================================
// `GradingService` Trait Implementation
//=========================================================================================

#[async_trait]
impl GradingService for OpenAiGradingAdapter {
    async fn grade_interview(
        &self,
        transcript: &[Turn],
        job_title: &str,
        company: &str,
    ) -> PortResult<GradeReport> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(build_prompt(transcript, job_title, company))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("Grading LLM response contained no text content.".to_string())
            })?;

        Ok(parse_grading_response(&text))
    }
}
