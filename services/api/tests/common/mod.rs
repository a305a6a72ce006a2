//! Shared fixtures: the real router over the in-memory store, with scripted
//! AI collaborators and a mailer that keeps what it sends.

#![allow(dead_code)]

use api_lib::{
    adapters::tts::base64_audio,
    config::Config,
    web::{self, AppState, SessionCodec},
};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use interview_core::{
    ports::{
        GradingService, MailService, OutgoingEmail, PortResult, QuestionGenerationService,
        QuestionRequest, TextToSpeechService,
    },
    GradeReport, Grader, GradingEvent, GradingQueue, InMemoryDatabase, InterviewLocks,
    InterviewService, OtpService, Turn,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub const SECRET: &str = "integration-test-session-secret-0123456789";

//=========================================================================================
// Fake Collaborators
//=========================================================================================

/// Asks "Question n of N for <job>".
pub struct ScriptedQuestions;

#[async_trait]
impl QuestionGenerationService for ScriptedQuestions {
    async fn generate_question(&self, request: &QuestionRequest) -> PortResult<String> {
        Ok(format!(
            "Question {} of {} for {}",
            request.question_number, request.max_questions, request.job_title
        ))
    }
}

pub struct FakeSpeech;

#[async_trait]
impl TextToSpeechService for FakeSpeech {
    async fn generate_audio(&self, _text: &str) -> PortResult<Vec<u8>> {
        Ok(b"RIFF".to_vec())
    }
}

pub struct FixedGrader;

#[async_trait]
impl GradingService for FixedGrader {
    async fn grade_interview(
        &self,
        transcript: &[Turn],
        _job_title: &str,
        _company: &str,
    ) -> PortResult<GradeReport> {
        Ok(GradeReport {
            grade: 81,
            feedback: format!("Reviewed {} turns.", transcript.len()),
        })
    }
}

#[derive(Default)]
pub struct CapturingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl CapturingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// The code from the most recent login email to `to`.
    pub fn last_code_for(&self, to: &str) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .filter(|m| m.to == to && m.subject == "Your Login Code")
            .find_map(|m| {
                let start = m.html.find("<strong>")? + "<strong>".len();
                let end = m.html[start..].find("</strong>")? + start;
                Some(m.html[start..end].to_string())
            })
    }
}

#[async_trait]
impl MailService for CapturingMailer {
    async fn send(&self, email: &OutgoingEmail) -> PortResult<()> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

//=========================================================================================
// Test Application
//=========================================================================================

pub struct TestApp {
    pub router: Router,
    pub db: Arc<InMemoryDatabase>,
    pub mailer: Arc<CapturingMailer>,
    pub sessions: SessionCodec,
    pub grading: GradingQueue,
    pub shutdown: CancellationToken,
}

pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: None,
        db_max_connections: 1,
        log_level: tracing::Level::DEBUG,
        session_secret: SECRET.to_string(),
        secure_cookies: false,
        cors_origin: "http://localhost:3000".to_string(),
        openai_api_key: "unused".to_string(),
        question_model: "unused".to_string(),
        grading_model: "unused".to_string(),
        tts_voice: "alloy".to_string(),
        mail_api_key: None,
        mail_api_url: "http://localhost/unused".to_string(),
        mail_from: "test@example.com".to_string(),
    }
}

impl TestApp {
    pub fn new() -> Self {
        let config = Arc::new(test_config());
        let db = Arc::new(InMemoryDatabase::new());
        let mailer = Arc::new(CapturingMailer::default());
        let locks = Arc::new(InterviewLocks::default());
        let shutdown = CancellationToken::new();

        let grader = Arc::new(Grader::new(db.clone(), Arc::new(FixedGrader), locks.clone()));
        let (grading, _worker) = GradingQueue::start(grader, shutdown.clone());
        let sessions = SessionCodec::new(SECRET, false);

        let state = Arc::new(AppState {
            db: db.clone(),
            config,
            sessions: sessions.clone(),
            otp: OtpService::new(db.clone(), mailer.clone()),
            interviews: InterviewService::new(
                db.clone(),
                Arc::new(ScriptedQuestions),
                Arc::new(FakeSpeech),
                grading.clone(),
                locks,
                base64_audio,
            ),
            mailer: mailer.clone(),
        });

        Self {
            router: web::router(state),
            db,
            mailer,
            sessions,
            grading,
            shutdown,
        }
    }

    pub fn grading_events(&self) -> broadcast::Receiver<GradingEvent> {
        self.grading.subscribe()
    }

    /// Sends one request and returns status, headers and the body parsed as JSON
    /// (`Value::Null` for an empty or non-JSON body).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        match body {
            Some(json) => {
                self.send_raw(method, uri, cookie, Some("application/json"), json.to_string())
                    .await
            }
            None => self.send_raw(method, uri, cookie, None, String::new()).await,
        }
    }

    /// Sends `body` verbatim, with `content_type` if one is given.
    pub async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        content_type: Option<&str>,
        body: String,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let request = builder.body(Body::from(body)).unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, json)
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> (StatusCode, HeaderMap, Value) {
        self.request(Method::GET, uri, cookie, None).await
    }

    pub async fn post(
        &self,
        uri: &str,
        cookie: Option<&str>,
        body: Value,
    ) -> (StatusCode, HeaderMap, Value) {
        self.request(Method::POST, uri, cookie, Some(body)).await
    }

    /// Runs the full OTP flow and returns a `Cookie` header value.
    pub async fn login(&self, email: &str) -> String {
        let (status, _, _) = self
            .post("/api/auth/send-otp", None, serde_json::json!({ "email": email }))
            .await;
        assert_eq!(status, StatusCode::OK);
        let code = self.mailer.last_code_for(email).expect("login code was mailed");

        let (status, headers, _) = self
            .post(
                "/api/auth/verify-otp",
                None,
                serde_json::json!({ "email": email, "otp": code }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        session_cookie(&headers).expect("session cookie was set")
    }

    /// Creates a text interview and returns its id.
    pub async fn create_interview(&self, cookie: &str, max_questions: u8) -> String {
        let (status, _, body) = self
            .post(
                "/api/interview/create",
                Some(cookie),
                serde_json::json!({
                    "jobTitle": "Backend Engineer",
                    "company": "Acme",
                    "location": "Remote",
                    "maxQuestions": max_questions,
                    "mode": "text",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["interviewId"].as_str().unwrap().to_string()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Extracts `session=<token>` from a response's `Set-Cookie` header.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::SET_COOKIE)?.to_str().ok()?;
    let pair = raw.split(';').next()?.trim();
    (pair.starts_with("session=") && pair.len() > "session=".len()).then(|| pair.to_string())
}
