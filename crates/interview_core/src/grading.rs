//! crates/interview_core/src/grading.rs
//!
//! Grading runs after the request that asked for it has already been answered.
//! `GradingQueue` hands jobs to a background worker; outcomes are written to the
//! interview record and broadcast as `GradingEvent`s.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::domain::{GradeRecord, InterviewStatus, MessageRole, Turn};
use crate::error::{ServiceError, ServiceResult};
use crate::locks::InterviewLocks;
use crate::ports::{DatabaseService, GradingService, PortError};

/// Answering fewer questions than configured is recorded as an early end.
pub fn final_status(max_questions: u8, answered: usize) -> InterviewStatus {
    if (max_questions as usize) > answered {
        InterviewStatus::EndedEarly
    } else {
        InterviewStatus::Completed
    }
}

pub fn clamp_grade(raw: i64) -> u8 {
    raw.clamp(0, 100) as u8
}

#[derive(Debug, Clone, PartialEq)]
pub enum GradingEvent {
    Graded {
        interview_id: Uuid,
        status: InterviewStatus,
        grade: u8,
    },
    Failed {
        interview_id: Uuid,
        reason: String,
    },
}

/// Grades one interview end to end.
pub struct Grader {
    db: Arc<dyn DatabaseService>,
    grading: Arc<dyn GradingService>,
    locks: Arc<InterviewLocks>,
}

impl Grader {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        grading: Arc<dyn GradingService>,
        locks: Arc<InterviewLocks>,
    ) -> Self {
        Self { db, grading, locks }
    }

    /// Loads the transcript, asks the grader, and persists the outcome in one update.
    /// On any failure the record is left exactly as it was.
    pub async fn grade(&self, interview_id: Uuid) -> ServiceResult<GradeRecord> {
        let _guard = self.locks.acquire(interview_id).await;

        let interview = self
            .db
            .get_interview(interview_id)
            .await
            .map_err(ServiceError::from_lookup)?;
        let messages = self.db.get_messages(interview_id).await?;

        let answered = messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .count();
        let status = final_status(interview.max_questions, answered);
        let transcript: Vec<Turn> = messages.iter().map(|m| m.to_turn()).collect();

        let report = self
            .grading
            .grade_interview(&transcript, &interview.job_title, &interview.company)
            .await?;

        let record = GradeRecord {
            status,
            grade: clamp_grade(report.grade),
            feedback: report.feedback,
            completed_at: Utc::now(),
        };
        self.db.record_grade(interview_id, &record).await?;
        Ok(record)
    }
}

//=========================================================================================
// Background Queue
//=========================================================================================

#[derive(Clone)]
pub struct GradingQueue {
    jobs: mpsc::UnboundedSender<Uuid>,
    events: broadcast::Sender<GradingEvent>,
}

impl GradingQueue {
    /// Spawns the worker. It stops taking jobs when `shutdown` fires, then waits
    /// for the jobs already running.
    pub fn start(grader: Arc<Grader>, shutdown: CancellationToken) -> (Self, JoinHandle<()>) {
        let (jobs, rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(64);
        let worker = tokio::spawn(run_worker(grader, rx, events.clone(), shutdown));
        (Self { jobs, events }, worker)
    }

    pub fn enqueue(&self, interview_id: Uuid) -> ServiceResult<()> {
        self.jobs.send(interview_id).map_err(|_| {
            ServiceError::Port(PortError::Unexpected(
                "grading worker is not running".to_string(),
            ))
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GradingEvent> {
        self.events.subscribe()
    }
}

async fn run_worker(
    grader: Arc<Grader>,
    mut jobs: mpsc::UnboundedReceiver<Uuid>,
    events: broadcast::Sender<GradingEvent>,
    shutdown: CancellationToken,
) {
    info!("Grading worker started.");
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            job = jobs.recv() => match job {
                Some(interview_id) => {
                    let grader = grader.clone();
                    let events = events.clone();
                    in_flight.spawn(grade_job(grader, events, interview_id));
                }
                None => break,
            },
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    error!("Grading task panicked: {:?}", e);
                }
            }
        }
    }

    if !in_flight.is_empty() {
        info!("Waiting for {} grading job(s) to finish.", in_flight.len());
    }
    while in_flight.join_next().await.is_some() {}
    info!("Grading worker stopped.");
}

async fn grade_job(grader: Arc<Grader>, events: broadcast::Sender<GradingEvent>, interview_id: Uuid) {
    let event = match grader.grade(interview_id).await {
        Ok(record) => {
            info!(
                "Graded interview {}: {} ({}/100)",
                interview_id, record.status, record.grade
            );
            GradingEvent::Graded {
                interview_id,
                status: record.status,
                grade: record.grade,
            }
        }
        Err(e) => {
            error!("Failed to grade interview {}: {}", interview_id, e);
            GradingEvent::Failed {
                interview_id,
                reason: e.to_string(),
            }
        }
    };
    if !publish(&events, event) {
        debug!("No listeners for grading outcome of interview {}", interview_id);
    }
}

/// Broadcasts an outcome if anyone is subscribed. Returns whether it was delivered.
fn publish(events: &broadcast::Sender<GradingEvent>, event: GradingEvent) -> bool {
    if events.receiver_count() == 0 {
        return false;
    }
    events.send(event).is_ok()
}
