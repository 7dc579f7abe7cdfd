//! Authentication
//!
//! Sign-up, sign-in, session lookup and sign-out are delegated to the
//! backend's auth service through the [`AuthProvider`] trait. The current
//! session is persisted locally so later invocations stay signed in.

pub mod gotrue;
pub mod session;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use gotrue::GoTrueAuth;
pub use session::SessionStore;

/// The signed-in user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Expiry as unix seconds
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

impl Session {
    /// Whether the access token is past its expiry
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|at| at <= Utc::now().timestamp())
            .unwrap_or(false)
    }
}

/// Errors from the auth provider
#[derive(Error, Debug)]
pub enum AuthError {
    /// Input rejected before any request was sent
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(&'static str),

    /// The auth service refused the request
    #[error("Authentication failed ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Transport-level failure
    #[error("Auth request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response or session file could not be parsed
    #[error("Invalid auth data: {0}")]
    Decode(#[from] serde_json::Error),

    /// Session file could not be read or written
    #[error("Session file error at '{path}': {source}")]
    SessionFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backend URL or key missing from configuration
    #[error("Backend not configured: {0}")]
    NotConfigured(&'static str),
}

/// Authentication capability consumed by the client
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Current session, if any
    ///
    /// An expired session is refreshed when it carries a refresh token;
    /// otherwise it counts as signed out.
    async fn get_session(&self) -> Result<Option<Session>, AuthError>;

    /// Register a new account
    ///
    /// Returns `None` when the service requires email confirmation before
    /// issuing a session.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, AuthError>;

    /// Sign in with email and password
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// End the current session
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Reject malformed credentials before contacting the service
pub fn validate_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AuthError::InvalidCredentials("email address is not valid"));
    }
    if password.is_empty() {
        return Err(AuthError::InvalidCredentials("password is empty"));
    }
    Ok(())
}
