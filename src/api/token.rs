//! Purpose: Model access tokens and application credentials.
//! Exports: `AccessToken`, `App`.
//! Role: Value types handed to `Client` and requests; no I/O.
//! Invariants: App access tokens have the form `{client_id}|{client_secret}`.
//! Invariants: Token lifetime checks compare against the instant passed in or `now_utc`.

use crate::core::error::{Error, ErrorKind};
use std::fmt;
use time::{Duration, OffsetDateTime};

const LONG_LIVED_AFTER: Duration = Duration::hours(2);

#[derive(Clone, Eq, PartialEq)]
pub struct AccessToken {
    value: String,
    expires_at: Option<OffsetDateTime>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    /// `expires_at` is epoch seconds; zero means the token does not report an expiry.
    pub fn with_expires_at(mut self, expires_at: i64) -> Self {
        self.expires_at = match expires_at {
            0 => None,
            seconds => OffsetDateTime::from_unix_timestamp(seconds).ok(),
        };
        self
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        self.expires_at
    }

    pub fn is_app_access_token(&self) -> bool {
        self.value.contains('|')
    }

    pub fn is_long_lived(&self) -> bool {
        self.is_long_lived_at(OffsetDateTime::now_utc())
    }

    pub fn is_long_lived_at(&self, now: OffsetDateTime) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at > now + LONG_LIVED_AFTER,
            None => self.is_app_access_token(),
        }
    }

    /// `None` when the token carries no expiry and is not an app token.
    pub fn is_expired(&self) -> Option<bool> {
        self.is_expired_at(OffsetDateTime::now_utc())
    }

    pub fn is_expired_at(&self, now: OffsetDateTime) -> Option<bool> {
        match self.expires_at {
            Some(expires_at) => Some(expires_at < now),
            None if self.is_app_access_token() => Some(false),
            None => None,
        }
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

// Keeps token values out of logs.
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl From<&str> for AccessToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AccessToken {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[derive(Clone, Eq, PartialEq)]
pub struct App {
    id: String,
    secret: String,
}

impl App {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Result<Self, Error> {
        let id = id.into();
        let secret = secret.into();
        if id.trim().is_empty() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("client_id is required")
                .with_hint("Set client_id in the config file or STEEIN_CLIENT_ID."));
        }
        if secret.trim().is_empty() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("client_secret is required")
                .with_hint("Set client_secret in the config file or STEEIN_CLIENT_SECRET."));
        }
        Ok(Self { id, secret })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn access_token(&self) -> AccessToken {
        AccessToken::new(format!("{}|{}", self.id, self.secret))
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}
