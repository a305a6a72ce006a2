//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use interview_core::domain::{
    GradeRecord, Interview, InterviewMode, InterviewStatus, Message, MessageRole, OtpCredential,
    ProfileUpdate, User, UserStats,
};
use interview_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Closes the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// A stored value that no longer maps onto the domain.
fn corrupt(e: impl std::fmt::Display) -> PortError {
    PortError::Unexpected(format!("corrupt row: {}", e))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const USER_COLUMNS: &str = "email, name, profile_photo, created_at, updated_at";
const INTERVIEW_COLUMNS: &str = "id, user_id, job_title, company, location, description, \
     max_questions, mode, status, grade, feedback, created_at, completed_at";

#[derive(FromRow)]
struct UserRecord {
    email: String,
    name: Option<String>,
    profile_photo: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            email: self.email,
            name: self.name,
            profile_photo: self.profile_photo,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct UpsertedUserRecord {
    #[sqlx(flatten)]
    user: UserRecord,
    inserted: bool,
}

#[derive(FromRow)]
struct InterviewRecord {
    id: Uuid,
    user_id: String,
    job_title: String,
    company: String,
    location: String,
    description: Option<String>,
    max_questions: i32,
    mode: String,
    status: String,
    grade: Option<i32>,
    feedback: Option<String>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}
impl InterviewRecord {
    fn to_domain(self) -> PortResult<Interview> {
        Ok(Interview {
            id: self.id,
            user_id: self.user_id,
            job_title: self.job_title,
            company: self.company,
            location: self.location,
            description: self.description,
            max_questions: u8::try_from(self.max_questions).map_err(corrupt)?,
            mode: self.mode.parse::<InterviewMode>().map_err(corrupt)?,
            status: self.status.parse::<InterviewStatus>().map_err(corrupt)?,
            grade: self.grade.map(|g| g.clamp(0, 100) as u8),
            feedback: self.feedback,
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}

#[derive(FromRow)]
struct MessageRecord {
    id: Uuid,
    interview_id: Uuid,
    role: String,
    content: String,
    timestamp: DateTime<Utc>,
}
impl MessageRecord {
    fn to_domain(self) -> PortResult<Message> {
        Ok(Message {
            id: self.id,
            interview_id: self.interview_id,
            role: self.role.parse::<MessageRole>().map_err(corrupt)?,
            content: self.content,
            timestamp: self.timestamp,
        })
    }
}

#[derive(FromRow)]
struct StatsRecord {
    total_interviews: i64,
    average_grade: Option<f64>,
    highest_grade: Option<i32>,
    lowest_grade: Option<i32>,
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn upsert_user(&self, email: &str) -> PortResult<(User, bool)> {
        // xmax is zero only for a freshly inserted row.
        let sql = format!(
            "INSERT INTO users (email, created_at, updated_at) VALUES ($1, $2, $2) \
             ON CONFLICT (email) DO UPDATE SET updated_at = EXCLUDED.updated_at \
             RETURNING {USER_COLUMNS}, (xmax = 0) AS inserted"
        );
        let record = sqlx::query_as::<_, UpsertedUserRecord>(&sql)
            .bind(email)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok((record.user.to_domain(), record.inserted))
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
                _ => unexpected(e),
            })?;
        Ok(record.to_domain())
    }

    async fn update_user_profile(&self, email: &str, update: &ProfileUpdate) -> PortResult<User> {
        let sql = format!(
            "UPDATE users SET name = COALESCE($2, name), \
             profile_photo = COALESCE($3, profile_photo), updated_at = $4 \
             WHERE email = $1 RETURNING {USER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email)
            .bind(update.name.as_deref())
            .bind(update.profile_photo.as_deref())
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))?;
        Ok(record.to_domain())
    }

    async fn save_otp(&self, credential: &OtpCredential) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO otps (id, email, code, expires_at, created_at, verified) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(credential.id)
        .bind(&credential.email)
        .bind(&credential.code)
        .bind(credential.expires_at)
        .bind(credential.created_at)
        .bind(credential.verified)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn consume_otp(&self, email: &str, code: &str, now: DateTime<Utc>) -> PortResult<bool> {
        let consumed: Option<(Uuid,)> = sqlx::query_as(
            "UPDATE otps SET verified = TRUE WHERE id = ( \
                 SELECT id FROM otps \
                 WHERE email = $1 AND code = $2 AND verified = FALSE AND expires_at > $3 \
                 ORDER BY created_at DESC LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) AND verified = FALSE \
             RETURNING id",
        )
        .bind(email)
        .bind(code)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(consumed.is_some())
    }

    async fn create_interview(&self, interview: &Interview) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO interviews (id, user_id, job_title, company, location, description, \
             max_questions, mode, status, grade, feedback, created_at, completed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(interview.id)
        .bind(&interview.user_id)
        .bind(&interview.job_title)
        .bind(&interview.company)
        .bind(&interview.location)
        .bind(interview.description.as_deref())
        .bind(interview.max_questions as i32)
        .bind(interview.mode.as_str())
        .bind(interview.status.as_str())
        .bind(interview.grade.map(i32::from))
        .bind(interview.feedback.as_deref())
        .bind(interview.created_at)
        .bind(interview.completed_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_interview(&self, interview_id: Uuid) -> PortResult<Interview> {
        let sql = format!("SELECT {INTERVIEW_COLUMNS} FROM interviews WHERE id = $1");
        let record = sqlx::query_as::<_, InterviewRecord>(&sql)
            .bind(interview_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    PortError::NotFound(format!("Interview {} not found", interview_id))
                }
                _ => unexpected(e),
            })?;
        record.to_domain()
    }

    async fn list_interviews_by_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> PortResult<Vec<Interview>> {
        let sql = format!(
            "SELECT {INTERVIEW_COLUMNS} FROM interviews WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2"
        );
        let records = sqlx::query_as::<_, InterviewRecord>(&sql)
            .bind(user_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn mark_interview_completed(
        &self,
        interview_id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE interviews SET status = 'completed', completed_at = $2 WHERE id = $1",
        )
        .bind(interview_id)
        .bind(completed_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Interview {} not found", interview_id)));
        }
        Ok(())
    }

    async fn record_grade(&self, interview_id: Uuid, record: &GradeRecord) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE interviews SET status = $2, grade = $3, feedback = $4, completed_at = $5 \
             WHERE id = $1",
        )
        .bind(interview_id)
        .bind(record.status.as_str())
        .bind(record.grade as i32)
        .bind(&record.feedback)
        .bind(record.completed_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Interview {} not found", interview_id)));
        }
        Ok(())
    }

    async fn delete_interview(&self, interview_id: Uuid) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        sqlx::query("DELETE FROM messages WHERE interview_id = $1")
            .bind(interview_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        let result = sqlx::query("DELETE FROM interviews WHERE id = $1")
            .bind(interview_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Interview {} not found", interview_id)));
        }
        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn get_user_stats(&self, user_id: &str) -> PortResult<UserStats> {
        let record = sqlx::query_as::<_, StatsRecord>(
            "SELECT COUNT(*) AS total_interviews, \
                    AVG(grade)::DOUBLE PRECISION AS average_grade, \
                    MAX(grade) AS highest_grade, \
                    MIN(grade) AS lowest_grade \
             FROM interviews WHERE user_id = $1 AND status = 'completed'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(UserStats {
            total_interviews: record.total_interviews,
            average_grade: record.average_grade.unwrap_or(0.0),
            highest_grade: record.highest_grade.map(i64::from).unwrap_or(0),
            lowest_grade: record.lowest_grade.map(i64::from).unwrap_or(0),
        })
    }

    async fn append_message(&self, message: &Message) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO messages (id, interview_id, role, content, timestamp) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(message.id)
        .bind(message.interview_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.timestamp)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_messages(&self, interview_id: Uuid) -> PortResult<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            "SELECT id, interview_id, role, content, timestamp FROM messages \
             WHERE interview_id = $1 ORDER BY timestamp ASC, seq ASC",
        )
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }
}
