//! services/api/src/web/session.rs
//!
//! Signed session tokens carried in the `session` cookie.
//!
//! A token is an HS256 JWT whose claims are the user's identity plus an expiry.
//! Verification is all-or-nothing: a bad signature, a malformed payload and an
//! expired token all yield `None`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use interview_core::domain::local_part;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const SESSION_COOKIE: &str = "session";

/// How long a freshly issued session lives.
pub fn session_ttl() -> Duration {
    Duration::days(7)
}

/// Sessions with less than this left are reissued by the gate.
pub fn refresh_window() -> Duration {
    Duration::days(2)
}

/// The identity claims of a signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub profile_picture_url: String,
    pub role: String,
    /// Expiry, unix seconds.
    pub exp: i64,
    pub iat: i64,
}

impl UserSession {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

//=========================================================================================
// Codec
//=========================================================================================

#[derive(Clone)]
pub struct SessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    secure_cookies: bool,
}

impl SessionCodec {
    pub fn new(secret: &str, secure_cookies: bool) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            secure_cookies,
        }
    }

    /// Issues a 7-day token. `name` defaults to the local part of the email.
    pub fn issue(&self, email: &str, name: Option<&str>) -> jsonwebtoken::errors::Result<String> {
        self.issue_until(email, name, Utc::now() + session_ttl())
    }

    pub fn issue_until(
        &self,
        email: &str,
        name: Option<&str>,
        expires: DateTime<Utc>,
    ) -> jsonwebtoken::errors::Result<String> {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| local_part(email));
        let claims = UserSession {
            user_id: email.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            profile_picture_url: String::new(),
            role: "user".to_string(),
            exp: expires.timestamp(),
            iat: Utc::now().timestamp(),
        };
        self.sign(&claims)
    }

    /// Same identity, new 7-day expiry.
    pub fn refresh(&self, session: &UserSession) -> jsonwebtoken::errors::Result<String> {
        let now = Utc::now();
        let claims = UserSession {
            exp: (now + session_ttl()).timestamp(),
            iat: now.timestamp(),
            ..session.clone()
        };
        self.sign(&claims)
    }

    pub fn verify(&self, token: &str) -> Option<UserSession> {
        match decode::<UserSession>(token, &self.decoding, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
                debug!("Session token expired");
                None
            }
            Err(e) => {
                warn!("Session token verification failed: {}", e);
                None
            }
        }
    }

    pub fn needs_refresh(&self, session: &UserSession, now: DateTime<Utc>) -> bool {
        session.expires_at() - now < refresh_window()
    }

    //=====================================================================================
    // Cookies
    //=====================================================================================

    pub fn session_cookie(&self, token: &str) -> String {
        self.cookie(token, session_ttl().num_seconds())
    }

    pub fn clear_cookie(&self) -> String {
        self.cookie("", 0)
    }

    fn cookie(&self, value: &str, max_age: i64) -> String {
        let mut cookie = format!(
            "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            SESSION_COOKIE, value, max_age
        );
        if self.secure_cookies {
            cookie.push_str("; Secure");
        }
        cookie
    }

    fn sign(&self, claims: &UserSession) -> jsonwebtoken::errors::Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
    }
}

/// Finds the session token in a `Cookie` header value.
pub fn token_from_cookie_header(header: &str) -> Option<&str> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then_some(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "an-adequately-long-signing-secret-value";

    fn codec() -> SessionCodec {
        SessionCodec::new(SECRET, true)
    }

    #[test]
    fn issued_token_verifies_with_default_claims() {
        let codec = codec();
        let token = codec.issue("ada@example.com", None).unwrap();
        let session = codec.verify(&token).unwrap();

        assert_eq!(session.user_id, "ada@example.com");
        assert_eq!(session.email, "ada@example.com");
        assert_eq!(session.name, "ada");
        assert_eq!(session.role, "user");
        assert_eq!(session.profile_picture_url, "");
        let remaining = session.expires_at() - Utc::now();
        assert!(remaining > Duration::days(6) && remaining <= Duration::days(7));
    }

    #[test]
    fn token_expired_one_second_ago_is_rejected() {
        let codec = codec();
        let token = codec
            .issue_until("ada@example.com", Some("Ada"), Utc::now() - Duration::seconds(1))
            .unwrap();
        assert!(codec.verify(&token).is_none());
    }

    #[test]
    fn tampered_and_foreign_tokens_are_rejected() {
        let codec = codec();
        let token = codec.issue("ada@example.com", None).unwrap();

        let (unsigned, signature) = token.rsplit_once('.').unwrap();
        let flipped = if signature.starts_with('A') { 'B' } else { 'A' };
        let tampered = format!("{}.{}{}", unsigned, flipped, &signature[1..]);
        assert!(codec.verify(&tampered).is_none());

        let other = SessionCodec::new("a-completely-different-signing-secret!!", true);
        assert!(other.verify(&token).is_none());
        assert!(codec.verify("not-a-jwt").is_none());
    }

    #[test]
    fn refresh_keeps_identity_and_extends_expiry() {
        let codec = codec();
        let token = codec
            .issue_until("ada@example.com", Some("Ada L"), Utc::now() + Duration::days(1))
            .unwrap();
        let session = codec.verify(&token).unwrap();
        assert!(codec.needs_refresh(&session, Utc::now()));

        let refreshed = codec.verify(&codec.refresh(&session).unwrap()).unwrap();
        assert_eq!(refreshed.name, "Ada L");
        assert_eq!(refreshed.email, session.email);
        assert!(refreshed.exp > session.exp);
        assert!(!codec.needs_refresh(&refreshed, Utc::now()));
    }

    #[test]
    fn cookies_carry_expected_attributes() {
        let cookie = codec().session_cookie("tok");
        assert_eq!(
            cookie,
            "session=tok; HttpOnly; SameSite=Lax; Path=/; Max-Age=604800; Secure"
        );
        let cleared = SessionCodec::new(SECRET, false).clear_cookie();
        assert_eq!(cleared, "session=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0");
    }

    #[test]
    fn session_token_is_found_among_other_cookies() {
        assert_eq!(
            token_from_cookie_header("theme=dark; session=abc.def; lang=en"),
            Some("abc.def")
        );
        assert_eq!(token_from_cookie_header("theme=dark"), None);
        assert_eq!(token_from_cookie_header("session="), None);
    }
}
