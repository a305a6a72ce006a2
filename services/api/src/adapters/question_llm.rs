//! services/api/src/adapters/question_llm.rs
//!
//! This module contains the adapter for the interviewer LLM.
//! It implements the `QuestionGenerationService` port from the `core` crate.

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
    domain::{MessageRole, Turn},
    ports::{PortError, PortResult, QuestionGenerationService, QuestionRequest},
};

const SYSTEM_INSTRUCTIONS: &str =
    "You are an experienced technical interviewer conducting a mock interview. \
     Reply with the next question only, with no preamble or commentary.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `QuestionGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiQuestionAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiQuestionAdapter {
    /// Creates a new `OpenAiQuestionAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

fn render_history(history: &[Turn]) -> String {
    history
        .iter()
        .map(|turn| {
            let speaker = match turn.role {
                MessageRole::Assistant => "AI",
                MessageRole::User => "User",
            };
            format!("{}: {}", speaker, turn.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the interviewer prompt for one question.
pub fn build_prompt(request: &QuestionRequest) -> String {
    let description = request
        .description
        .as_deref()
        .map(|d| format!("Job Description: {}\n", d))
        .unwrap_or_default();
    let history = if request.history.is_empty() {
        "This is the first question.".to_string()
    } else {
        render_history(&request.history)
    };
    let closing = if request.is_last_question() {
        "- This is the LAST question, so end with 'Thank you for the interview'\n"
    } else {
        ""
    };

    format!(
        "Job Title: {job}\n\
         Company: {company}\n\
         {description}\n\
         Current Question: {n} of {max}\n\n\
         Previous Conversation:\n{history}\n\n\
         Guidelines:\n\
         - Ask relevant behavioral and technical questions appropriate for the {job} role\n\
         - Vary question difficulty progressively\n\
         - Follow up on previous answers when appropriate\n\
         - Keep questions concise (1-2 sentences)\n\
         {closing}\
         - Do not repeat questions that have already been asked\n\
         - Make the question natural and conversational\n\n\
         Generate the next interview question now:",
        job = request.job_title,
        company = request.company,
        n = request.question_number,
        max = request.max_questions,
    )
}

//=========================================================================================
// `QuestionGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl QuestionGenerationService for OpenAiQuestionAdapter {
    async fn generate_question(&self, request: &QuestionRequest) -> PortResult<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(build_prompt(request))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let question = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                PortError::Unexpected("Interviewer LLM returned no question.".to_string())
            })?;

        Ok(question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(question_number: usize, history: Vec<Turn>) -> QuestionRequest {
        QuestionRequest {
            job_title: "Data Engineer".to_string(),
            company: "Globex".to_string(),
            description: None,
            history,
            question_number,
            max_questions: 3,
        }
    }

    #[test]
    fn first_question_prompt_says_so() {
        let prompt = build_prompt(&request(1, Vec::new()));
        assert!(prompt.contains("Current Question: 1 of 3"));
        assert!(prompt.contains("This is the first question."));
        assert!(!prompt.contains("Job Description"));
        assert!(!prompt.contains("LAST question"));
    }

    #[test]
    fn last_question_prompt_asks_for_closing_line() {
        let history = vec![
            Turn {
                role: MessageRole::Assistant,
                content: "Why Globex?".to_string(),
            },
            Turn {
                role: MessageRole::User,
                content: "Scale.".to_string(),
            },
        ];
        let prompt = build_prompt(&request(3, history));
        assert!(prompt.contains("AI: Why Globex?\nUser: Scale."));
        assert!(prompt.contains("Thank you for the interview"));
    }
}
