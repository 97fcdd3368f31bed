//! Identity and session models

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::sanitize_text;

/// Maximum accepted email length, in characters.
pub const MAX_EMAIL_CHARS: usize = 320;
/// Display name given to accounts created without one.
pub const DEFAULT_ACCOUNT_NAME: &str = "Auri User";

/// An authenticated user as reported by the remote auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            email: None,
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Case-insensitive email comparison.
    pub fn has_email(&self, email: &str) -> bool {
        self.email
            .as_deref()
            .is_some_and(|own| own.eq_ignore_ascii_case(email.trim()))
    }

    /// Best human-readable label: name, then email, then id.
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}

/// Persisted login record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub identity: Identity,
    pub restored_at: DateTime<Utc>,
}

impl Session {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            restored_at: Utc::now(),
        }
    }
}

/// Email/password pair with a redacted `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Trim and cap the email; both fields are required.
    pub fn new(email: &str, password: &str) -> Result<Self> {
        let email = sanitize_text(email, MAX_EMAIL_CHARS, "");
        if email.is_empty() || password.is_empty() {
            return Err(Error::InvalidInput(
                "Email and password are required.".to_string(),
            ));
        }
        Ok(Self {
            email,
            password: password.to_string(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
