//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        tts::{base64_audio, voice_from_name},
        DbAdapter, HttpMailAdapter, LogMailAdapter, OpenAiGradingAdapter, OpenAiQuestionAdapter,
        OpenAiTtsAdapter,
    },
    config::Config,
    error::ApiError,
    web::{self, AppState, SessionCodec},
};
use async_openai::{config::OpenAIConfig, types::audio::SpeechModel, Client};
use interview_core::{
    ports::{DatabaseService, MailService},
    Grader, GradingQueue, InMemoryDatabase, InterviewLocks, InterviewService, OtpService,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    let (db, pg): (Arc<dyn DatabaseService>, Option<Arc<DbAdapter>>) =
        match config.database_url.as_deref() {
            Some(url) => {
                info!("Connecting to database...");
                let pool = PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .connect(url)
                    .await?;
                let adapter = Arc::new(DbAdapter::new(pool));
                info!("Running database migrations...");
                adapter.run_migrations().await?;
                info!("Database migrations complete.");
                (adapter.clone() as Arc<dyn DatabaseService>, Some(adapter))
            }
            None => {
                warn!("DATABASE_URL is not set; using the in-memory store. Data will not survive a restart.");
                (Arc::new(InMemoryDatabase::new()) as Arc<dyn DatabaseService>, None)
            }
        };

    // --- 3. Initialize Service Adapters ---
    let openai_client =
        Client::with_config(OpenAIConfig::new().with_api_key(config.openai_api_key.clone()));

    let questions = Arc::new(OpenAiQuestionAdapter::new(
        openai_client.clone(),
        config.question_model.clone(),
    ));
    let grading = Arc::new(OpenAiGradingAdapter::new(
        openai_client.clone(),
        config.grading_model.clone(),
    ));
    let speech = Arc::new(OpenAiTtsAdapter::new(
        openai_client,
        SpeechModel::Tts1,
        voice_from_name(&config.tts_voice),
    ));

    let mailer: Arc<dyn MailService> = match config.mail_api_key.clone() {
        Some(key) => Arc::new(HttpMailAdapter::new(
            config.mail_api_url.clone(),
            key,
            config.mail_from.clone(),
        )),
        None => {
            warn!("MAIL_API_KEY is not set; outgoing mail will only be logged.");
            Arc::new(LogMailAdapter)
        }
    };

    // --- 4. Start the Grading Worker ---
    let shutdown = CancellationToken::new();
    let locks = Arc::new(InterviewLocks::default());
    let grader = Arc::new(Grader::new(db.clone(), grading, locks.clone()));
    let (grading_queue, grading_worker) = GradingQueue::start(grader, shutdown.clone());

    // --- 5. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db.clone(),
        config: config.clone(),
        sessions: SessionCodec::new(&config.session_secret, config.secure_cookies),
        otp: OtpService::new(db.clone(), mailer.clone()),
        interviews: InterviewService::new(
            db,
            questions,
            speech,
            grading_queue,
            locks,
            base64_audio,
        ),
        mailer,
    });

    let app = web::router(app_state);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- 7. Drain Background Work ---
    info!("Server stopped; waiting for in-flight grading jobs...");
    shutdown.cancel();
    if let Err(e) = grading_worker.await {
        warn!("Grading worker ended abnormally: {}", e);
    }
    if let Some(pg) = pg {
        pg.close().await;
    }
    info!("Shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}
