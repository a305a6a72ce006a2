//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the interview endpoints and the master
//! definition for the OpenAPI specification.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use interview_core::{Interview, Message, NewInterview, Question, TurnOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::error::{ApiError, ErrorBody};
use crate::web::extract::{ApiJson, ApiQuery};
use crate::web::session::UserSession;
use crate::web::state::AppState;
use crate::web::{auth, profile};

pub const DEFAULT_LIST_LIMIT: usize = 10;
pub const MAX_LIST_LIMIT: usize = 50;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::send_otp_handler,
        auth::verify_otp_handler,
        auth::logout_handler,
        profile::get_profile_handler,
        profile::update_profile_handler,
        profile::stats_handler,
        list_interviews_handler,
        create_interview_handler,
        get_interview_handler,
        submit_answer_handler,
        complete_interview_handler,
        delete_interview_handler,
    ),
    components(
        schemas(
            ErrorBody,
            SuccessResponse,
            HealthResponse,
            auth::SendOtpRequest,
            auth::VerifyOtpRequest,
            profile::ProfileResponse,
            profile::UpdateProfileRequest,
            profile::UpdateProfileResponse,
            profile::StatsResponse,
            CreateInterviewRequest,
            CreateInterviewResponse,
            QuestionDto,
            SubmitAnswerRequest,
            SubmitAnswerResponse,
            InterviewDto,
            MessageDto,
            InterviewDetailResponse,
        )
    ),
    tags(
        (name = "Interview Practice API", description = "Passwordless login and AI-driven mock interviews.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInterviewRequest {
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Any JSON value is accepted here so that a wrong type is reported as a
    /// range error rather than a body rejection.
    #[serde(default)]
    #[schema(value_type = Option<i64>)]
    pub max_questions: Option<serde_json::Value>,
    #[serde(default)]
    pub mode: String,
}

impl From<CreateInterviewRequest> for NewInterview {
    fn from(req: CreateInterviewRequest) -> Self {
        let max_questions = match req.max_questions {
            None | Some(serde_json::Value::Null) => 0,
            Some(value) => value.as_i64().unwrap_or(-1),
        };
        NewInterview {
            job_title: req.job_title,
            company: req.company,
            location: req.location,
            description: req.description,
            max_questions,
            mode: req.mode,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDto {
    pub text: String,
    /// Base64-encoded WAV; only for speech interviews.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
}

impl From<Question> for QuestionDto {
    fn from(q: Question) -> Self {
        Self {
            text: q.text,
            audio_base64: q.audio_base64,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInterviewResponse {
    pub interview_id: Uuid,
    pub first_question: QuestionDto,
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitAnswerRequest {
    #[serde(default)]
    pub content: String,
}

/// Either `nextQuestion` or `completed: true`.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_question: Option<QuestionDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl From<TurnOutcome> for SubmitAnswerResponse {
    fn from(outcome: TurnOutcome) -> Self {
        match outcome {
            TurnOutcome::NextQuestion(q) => Self {
                next_question: Some(q.into()),
                completed: None,
            },
            TurnOutcome::Completed => Self {
                next_question: None,
                completed: Some(true),
            },
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterviewDto {
    pub id: Uuid,
    pub job_title: String,
    pub company: String,
    pub location: String,
    pub description: Option<String>,
    pub max_questions: u8,
    pub mode: String,
    pub status: String,
    pub grade: Option<u8>,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Interview> for InterviewDto {
    fn from(i: Interview) -> Self {
        Self {
            id: i.id,
            job_title: i.job_title,
            company: i.company,
            location: i.location,
            description: i.description,
            max_questions: i.max_questions,
            mode: i.mode.to_string(),
            status: i.status.to_string(),
            grade: i.grade,
            feedback: i.feedback,
            created_at: i.created_at,
            completed_at: i.completed_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct MessageDto {
    pub id: Uuid,
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<Message> for MessageDto {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            role: m.role.to_string(),
            content: m.content,
            timestamp: m.timestamp,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct InterviewDetailResponse {
    pub interview: InterviewDto,
    pub messages: Vec<MessageDto>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

fn parse_interview_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest("Invalid interview ID".to_string()))
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// List the caller's interviews, newest first.
#[utoipa::path(
    get,
    path = "/api/interview",
    params(("limit" = Option<usize>, Query, description = "At most this many (default 10, max 50).")),
    responses(
        (status = 200, description = "Interviews", body = [InterviewDto]),
        (status = 401, description = "No session", body = ErrorBody)
    )
)]
pub async fn list_interviews_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<InterviewDto>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let interviews = state.interviews.list(&session.email, limit).await?;
    Ok(Json(interviews.into_iter().map(InterviewDto::from).collect()))
}

/// Create an interview and receive its first question.
#[utoipa::path(
    post,
    path = "/api/interview/create",
    request_body = CreateInterviewRequest,
    responses(
        (status = 201, description = "Interview created", body = CreateInterviewResponse),
        (status = 400, description = "Invalid settings", body = ErrorBody),
        (status = 500, description = "Question generation failed", body = ErrorBody)
    )
)]
pub async fn create_interview_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    ApiJson(req): ApiJson<CreateInterviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state.interviews.create(&session.email, req.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateInterviewResponse {
            interview_id: created.interview_id,
            first_question: created.first_question.into(),
        }),
    ))
}

/// Fetch an interview with its ordered message log.
#[utoipa::path(
    get,
    path = "/api/interview/{id}",
    params(("id" = Uuid, Path, description = "Interview id")),
    responses(
        (status = 200, description = "Interview and messages", body = InterviewDetailResponse),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn get_interview_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Path(id): Path<String>,
) -> Result<Json<InterviewDetailResponse>, ApiError> {
    let id = parse_interview_id(&id)?;
    let (interview, messages) = state.interviews.get_with_messages(&session.email, id).await?;
    Ok(Json(InterviewDetailResponse {
        interview: interview.into(),
        messages: messages.into_iter().map(MessageDto::from).collect(),
    }))
}

/// Submit an answer; returns the next question or signals completion.
#[utoipa::path(
    post,
    path = "/api/interview/{id}/message",
    params(("id" = Uuid, Path, description = "Interview id")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Next question or completion", body = SubmitAnswerResponse),
        (status = 400, description = "Empty answer or malformed id", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody),
        (status = 409, description = "Interview busy or already finished", body = ErrorBody)
    )
)]
pub async fn submit_answer_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<SubmitAnswerRequest>,
) -> Result<Json<SubmitAnswerResponse>, ApiError> {
    let id = parse_interview_id(&id)?;
    let outcome = state
        .interviews
        .submit_answer(&session.email, id, &req.content)
        .await?;
    Ok(Json(outcome.into()))
}

/// Finish the interview; grading happens in the background.
#[utoipa::path(
    post,
    path = "/api/interview/{id}/complete",
    params(("id" = Uuid, Path, description = "Interview id")),
    responses(
        (status = 202, description = "Grading queued", body = SuccessResponse),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn complete_interview_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_interview_id(&id)?;
    state.interviews.complete(&session.email, id).await?;
    Ok((StatusCode::ACCEPTED, Json(SuccessResponse::ok())))
}

/// Delete an interview and all of its messages.
#[utoipa::path(
    delete,
    path = "/api/interview/{id}/delete",
    params(("id" = Uuid, Path, description = "Interview id")),
    responses(
        (status = 200, description = "Deleted", body = SuccessResponse),
        (status = 404, description = "Not found", body = ErrorBody),
        (status = 409, description = "Interview busy", body = ErrorBody)
    )
)]
pub async fn delete_interview_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let id = parse_interview_id(&id)?;
    state.interviews.delete(&session.email, id).await?;
    Ok(Json(SuccessResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(max_questions: Option<serde_json::Value>) -> CreateInterviewRequest {
        CreateInterviewRequest {
            job_title: "SRE".into(),
            company: "Initech".into(),
            location: "Remote".into(),
            description: None,
            max_questions,
            mode: "text".into(),
        }
    }

    #[test]
    fn max_questions_of_the_wrong_type_becomes_out_of_range() {
        assert_eq!(NewInterview::from(request(None)).max_questions, 0);
        assert_eq!(
            NewInterview::from(request(Some(serde_json::json!(3)))).max_questions,
            3
        );
        assert_eq!(
            NewInterview::from(request(Some(serde_json::json!("3")))).max_questions,
            -1
        );
    }

    #[test]
    fn turn_outcomes_serialize_to_one_of_two_shapes() {
        let next = SubmitAnswerResponse::from(TurnOutcome::NextQuestion(Question {
            text: "Why?".into(),
            audio_base64: None,
        }));
        assert_eq!(
            serde_json::to_value(next).unwrap(),
            serde_json::json!({ "nextQuestion": { "text": "Why?" } })
        );
        let done = SubmitAnswerResponse::from(TurnOutcome::Completed);
        assert_eq!(
            serde_json::to_value(done).unwrap(),
            serde_json::json!({ "completed": true })
        );
    }

    #[test]
    fn bad_interview_id_is_a_client_error() {
        assert!(matches!(
            parse_interview_id("not-a-uuid"),
            Err(ApiError::BadRequest(msg)) if msg == "Invalid interview ID"
        ));
    }
}
