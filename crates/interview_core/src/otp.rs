//! crates/interview_core/src/otp.rs
//!
//! One-time login codes: issue, deliver, verify.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{otp_ttl, OtpCredential};
use crate::error::{ServiceError, ServiceResult};
use crate::notifications::otp_email;
use crate::ports::{DatabaseService, MailService, PortResult};

/// Rejects anything that is obviously not an address.
pub fn validate_email(email: &str) -> ServiceResult<()> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ServiceError::Validation("Valid email is required".to_string()));
    }
    Ok(())
}

/// Six ASCII digits, uniformly drawn; leading zeros allowed.
pub fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", n)
}

#[derive(Clone)]
pub struct OtpService {
    db: Arc<dyn DatabaseService>,
    mailer: Arc<dyn MailService>,
}

impl OtpService {
    pub fn new(db: Arc<dyn DatabaseService>, mailer: Arc<dyn MailService>) -> Self {
        Self { db, mailer }
    }

    /// Stores a fresh code for `email` and returns it. Earlier codes stay valid.
    pub async fn issue(&self, email: &str) -> ServiceResult<String> {
        self.issue_at(email, Utc::now()).await
    }

    pub async fn issue_at(&self, email: &str, now: DateTime<Utc>) -> ServiceResult<String> {
        validate_email(email)?;
        let code = generate_code();
        let credential = OtpCredential {
            id: Uuid::new_v4(),
            email: email.to_string(),
            code: code.clone(),
            expires_at: now + otp_ttl(),
            created_at: now,
            verified: false,
        };
        self.db.save_otp(&credential).await?;
        Ok(code)
    }

    /// Issues a code and emails it to the address.
    pub async fn send_code(&self, email: &str) -> ServiceResult<()> {
        let code = self.issue(email).await?;
        self.mailer.send(&otp_email(email, &code)).await?;
        info!("Sent login code to {}", email);
        Ok(())
    }

    /// `true` exactly once per issued code, and only before it expires.
    /// Wrong and expired codes are not told apart.
    pub async fn verify(&self, email: &str, code: &str) -> PortResult<bool> {
        self.verify_at(email, code, Utc::now()).await
    }

    pub async fn verify_at(&self, email: &str, code: &str, now: DateTime<Utc>) -> PortResult<bool> {
        let matched = self.db.consume_otp(email, code, now).await?;
        if !matched {
            warn!("Rejected login code for {}", email);
        }
        Ok(matched)
    }
}
