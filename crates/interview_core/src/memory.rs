//! crates/interview_core/src/memory.rs
//!
//! An in-process `DatabaseService`. Used by the test suites and by the server
//! when no database URL is configured.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{
    GradeRecord, Interview, InterviewStatus, Message, OtpCredential, ProfileUpdate, User,
    UserStats,
};
use crate::ports::{DatabaseService, PortError, PortResult};

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    otps: Vec<OtpCredential>,
    interviews: HashMap<Uuid, Interview>,
    messages: Vec<Message>,
}

#[derive(Default)]
pub struct InMemoryDatabase {
    tables: Mutex<Tables>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored credential for `email`, oldest first.
    pub async fn otps_for(&self, email: &str) -> Vec<OtpCredential> {
        let tables = self.tables.lock().await;
        tables
            .otps
            .iter()
            .filter(|otp| otp.email == email)
            .cloned()
            .collect()
    }
}

fn interview_not_found(interview_id: Uuid) -> PortError {
    PortError::NotFound(format!("Interview {} not found", interview_id))
}

#[async_trait]
impl DatabaseService for InMemoryDatabase {
    async fn upsert_user(&self, email: &str) -> PortResult<(User, bool)> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        if let Some(user) = tables.users.get_mut(email) {
            user.updated_at = now;
            return Ok((user.clone(), false));
        }
        let user = User {
            email: email.to_string(),
            name: None,
            profile_photo: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(email.to_string(), user.clone());
        Ok((user, true))
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<User> {
        let tables = self.tables.lock().await;
        tables
            .users
            .get(email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn update_user_profile(&self, email: &str, update: &ProfileUpdate) -> PortResult<User> {
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .get_mut(email)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))?;
        if let Some(name) = &update.name {
            user.name = Some(name.clone());
        }
        if let Some(photo) = &update.profile_photo {
            user.profile_photo = Some(photo.clone());
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn save_otp(&self, credential: &OtpCredential) -> PortResult<()> {
        self.tables.lock().await.otps.push(credential.clone());
        Ok(())
    }

    async fn consume_otp(&self, email: &str, code: &str, now: DateTime<Utc>) -> PortResult<bool> {
        let mut tables = self.tables.lock().await;
        match tables
            .otps
            .iter_mut()
            .rev()
            .find(|otp| otp.accepts(email, code, now))
        {
            Some(otp) => {
                otp.verified = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_interview(&self, interview: &Interview) -> PortResult<()> {
        let mut tables = self.tables.lock().await;
        tables.interviews.insert(interview.id, interview.clone());
        Ok(())
    }

    async fn get_interview(&self, interview_id: Uuid) -> PortResult<Interview> {
        let tables = self.tables.lock().await;
        tables
            .interviews
            .get(&interview_id)
            .cloned()
            .ok_or_else(|| interview_not_found(interview_id))
    }

    async fn list_interviews_by_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> PortResult<Vec<Interview>> {
        let tables = self.tables.lock().await;
        let mut interviews: Vec<Interview> = tables
            .interviews
            .values()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        interviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        interviews.truncate(limit);
        Ok(interviews)
    }

    async fn mark_interview_completed(
        &self,
        interview_id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut tables = self.tables.lock().await;
        let interview = tables
            .interviews
            .get_mut(&interview_id)
            .ok_or_else(|| interview_not_found(interview_id))?;
        interview.status = InterviewStatus::Completed;
        interview.completed_at = Some(completed_at);
        Ok(())
    }

    async fn record_grade(&self, interview_id: Uuid, record: &GradeRecord) -> PortResult<()> {
        let mut tables = self.tables.lock().await;
        let interview = tables
            .interviews
            .get_mut(&interview_id)
            .ok_or_else(|| interview_not_found(interview_id))?;
        interview.status = record.status;
        interview.grade = Some(record.grade);
        interview.feedback = Some(record.feedback.clone());
        interview.completed_at = Some(record.completed_at);
        Ok(())
    }

    async fn delete_interview(&self, interview_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.lock().await;
        tables.messages.retain(|m| m.interview_id != interview_id);
        tables
            .interviews
            .remove(&interview_id)
            .map(|_| ())
            .ok_or_else(|| interview_not_found(interview_id))
    }

    async fn get_user_stats(&self, user_id: &str) -> PortResult<UserStats> {
        let tables = self.tables.lock().await;
        let completed: Vec<&Interview> = tables
            .interviews
            .values()
            .filter(|i| i.user_id == user_id && i.status == InterviewStatus::Completed)
            .collect();
        let total_interviews = completed.len() as i64;
        let grades: Vec<i64> = completed
            .iter()
            .filter_map(|i| i.grade.map(i64::from))
            .collect();

        if grades.is_empty() {
            return Ok(UserStats {
                total_interviews,
                ..UserStats::default()
            });
        }
        Ok(UserStats {
            total_interviews,
            average_grade: grades.iter().sum::<i64>() as f64 / grades.len() as f64,
            highest_grade: grades.iter().copied().max().unwrap_or(0),
            lowest_grade: grades.iter().copied().min().unwrap_or(0),
        })
    }

    async fn append_message(&self, message: &Message) -> PortResult<()> {
        self.tables.lock().await.messages.push(message.clone());
        Ok(())
    }

    async fn get_messages(&self, interview_id: Uuid) -> PortResult<Vec<Message>> {
        let tables = self.tables.lock().await;
        let mut messages: Vec<Message> = tables
            .messages
            .iter()
            .filter(|m| m.interview_id == interview_id)
            .cloned()
            .collect();
        // Stable: equal timestamps keep insertion order.
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(messages)
    }
}
