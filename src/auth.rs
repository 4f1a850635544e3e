//! Credentials, session tokens, and two-factor code generation.
//!
//! The API hands out a short-lived JWT bearer token on login. Accounts with
//! two-factor enabled get an intermediate `tfa_token` first and must answer
//! with a time-based one-time code derived from the account's base32 secret.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use thiserror::Error;
use totp_rs::{Algorithm, Secret, TOTP};

/// One-time codes are standard TOTP: SHA-1, 6 digits, 30 second period.
const TOTP_DIGITS: usize = 6;
const TOTP_SKEW: u8 = 1;
const TOTP_PERIOD: u64 = 30;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid two-factor secret: {0}")]
    InvalidTfaSecret(String),
    #[error("two-factor code generation failed: {0}")]
    Totp(String),
}

/// Login credentials. The TFA secret is optional but strongly recommended;
/// without it accounts with two-factor enabled cannot complete the login.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    password: String,
    tfa_secret: Option<String>,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            tfa_secret: None,
        }
    }

    pub fn with_tfa_secret(mut self, secret: impl Into<String>) -> Self {
        self.tfa_secret = Some(secret.into());
        self
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn has_tfa_secret(&self) -> bool {
        self.tfa_secret.is_some()
    }

    /// Current one-time code for the stored secret, if any.
    pub fn totp_code(&self) -> Result<Option<String>, AuthError> {
        match &self.tfa_secret {
            Some(secret) => totp_code_at(secret, unix_now()).map(Some),
            None => Ok(None),
        }
    }
}

// Credentials never appear in logs or error chains.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("tfa_secret", &self.tfa_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Bearer token held for the process lifetime and refreshed by re-login.
#[derive(Debug, Clone)]
pub struct SessionToken {
    access_token: String,
    issued_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            issued_at: Utc::now(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

/// Generates the one-time code for a base32 secret at the given unix time.
/// Secrets are accepted with spaces and in either case, the way the account
/// settings page displays them.
pub fn totp_code_at(secret: &str, unix_time: u64) -> Result<String, AuthError> {
    let normalized = secret.trim().replace(' ', "").to_uppercase();

    let secret_bytes = Secret::Encoded(normalized)
        .to_bytes()
        .map_err(|err| AuthError::InvalidTfaSecret(format!("{err:?}")))?;

    let totp = TOTP::new(
        Algorithm::SHA1,
        TOTP_DIGITS,
        TOTP_SKEW,
        TOTP_PERIOD,
        secret_bytes,
    )
    .map_err(|err| AuthError::Totp(err.to_string()))?;

    Ok(totp.generate(unix_time))
}
