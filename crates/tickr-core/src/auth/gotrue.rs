//! GoTrue auth client
//!
//! Talks to `{api_url}/auth/v1` with the project's anon key and keeps the
//! resulting session in a [`SessionStore`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::session::SessionStore;
use super::{validate_credentials, AuthError, AuthProvider, Session, User};
use crate::config::Config;

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl From<TokenResponse> for Session {
    fn from(token: TokenResponse) -> Self {
        let expires_at = token
            .expires_at
            .or_else(|| token.expires_in.map(|secs| Utc::now().timestamp() + secs));
        Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            user: token.user,
        }
    }
}

/// Auth provider backed by a GoTrue endpoint
#[derive(Debug, Clone)]
pub struct GoTrueAuth {
    http: Client,
    base_url: String,
    api_key: String,
    sessions: SessionStore,
}

impl GoTrueAuth {
    pub fn new(
        base_url: &str,
        api_key: &str,
        sessions: SessionStore,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            sessions,
        })
    }

    /// Create a client from configuration
    pub fn from_config(config: &Config) -> Result<Self, AuthError> {
        let base_url = config
            .api_url
            .as_deref()
            .ok_or(AuthError::NotConfigured("api_url"))?;
        let api_key = config
            .anon_key
            .as_deref()
            .ok_or(AuthError::NotConfigured("anon_key"))?;
        Self::new(
            base_url,
            api_key,
            SessionStore::new(config.session_path()),
            config.request_timeout(),
        )
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    async fn post(&self, path: &str, bearer: &str, body: Value) -> Result<Response, AuthError> {
        let resp = self
            .http
            .post(self.url(path))
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let text = resp.text().await.unwrap_or_default();
        Err(AuthError::Rejected {
            status: status.as_u16(),
            message: error_message(&text),
        })
    }

    /// Exchange a refresh token for a new session and store it
    pub async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let resp = self
            .post(
                "token?grant_type=refresh_token",
                &self.api_key,
                json!({ "refresh_token": refresh_token }),
            )
            .await?;

        let token: TokenResponse = resp.json().await?;
        let session: Session = token.into();
        self.sessions.save(&session)?;
        info!("Refreshed session for {}", session.user.id);
        Ok(session)
    }
}

#[async_trait]
impl AuthProvider for GoTrueAuth {
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(session) = self.sessions.load()? else {
            return Ok(None);
        };
        if !session.is_expired() {
            return Ok(Some(session));
        }

        debug!("Stored session for {} has expired", session.user.id);
        let Some(ref refresh_token) = session.refresh_token else {
            return Ok(None);
        };
        match self.refresh(refresh_token).await {
            Ok(fresh) => Ok(Some(fresh)),
            Err(e) => {
                warn!("Session refresh failed: {}", e);
                Ok(None)
            }
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, AuthError> {
        validate_credentials(email, password)?;
        let resp = self
            .post(
                "signup",
                &self.api_key,
                json!({ "email": email.trim(), "password": password }),
            )
            .await?;

        let body: Value = resp.json().await?;
        if body.get("access_token").is_some() {
            let session: Session = serde_json::from_value::<TokenResponse>(body)?.into();
            self.sessions.save(&session)?;
            info!("Signed up and signed in as {}", session.user.id);
            Ok(Some(session))
        } else {
            info!("Signed up {}; confirmation required", email.trim());
            Ok(None)
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        validate_credentials(email, password)?;
        let resp = self
            .post(
                "token?grant_type=password",
                &self.api_key,
                json!({ "email": email.trim(), "password": password }),
            )
            .await?;

        let token: TokenResponse = resp.json().await?;
        let session: Session = token.into();
        self.sessions.save(&session)?;
        info!("Signed in as {}", session.user.id);
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(session) = self.sessions.load()? {
            if let Err(e) = self.post("logout", &session.access_token, json!({})).await {
                warn!("Remote sign-out failed: {}", e);
            }
        }
        self.sessions.clear()
    }
}

/// Pull a readable message out of a GoTrue error body
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn auth(temp_dir: &TempDir) -> GoTrueAuth {
        auth_at(temp_dir, "https://project.supabase.co/")
    }

    fn auth_at(temp_dir: &TempDir, base_url: &str) -> GoTrueAuth {
        GoTrueAuth::new(
            base_url,
            "anon",
            SessionStore::new(temp_dir.path().join("session.json")),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    /// Answer a single HTTP request with a canned response
    ///
    /// Resolves to the raw request text.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let content_length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });

        (base_url, handle)
    }

    fn session(expires_at: i64) -> Session {
        Session {
            access_token: "jwt".to_string(),
            refresh_token: None,
            expires_at: Some(expires_at),
            user: User {
                id: "u-1".to_string(),
                email: Some("a@example.com".to_string()),
            },
        }
    }

    #[test]
    fn test_urls() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(
            auth(&temp_dir).url("token?grant_type=password"),
            "https://project.supabase.co/auth/v1/token?grant_type=password"
        );
    }

    #[test]
    fn test_token_response_computes_expiry() {
        let token: TokenResponse = serde_json::from_value(json!({
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "r",
            "user": { "id": "u-1", "email": "a@example.com", "aud": "authenticated" }
        }))
        .unwrap();

        let session: Session = token.into();
        let expires_at = session.expires_at.unwrap();
        assert!(expires_at > Utc::now().timestamp() + 3500);
        assert_eq!(session.user.id, "u-1");
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(
            error_message(r#"{"code":422,"msg":"User already registered"}"#),
            "User already registered"
        );
        assert_eq!(error_message("gateway timeout"), "gateway timeout");
    }

    #[tokio::test]
    async fn test_get_session_ignores_expired() {
        let temp_dir = TempDir::new().unwrap();
        let auth = auth(&temp_dir);

        assert!(auth.get_session().await.unwrap().is_none());

        auth.sessions()
            .save(&session(Utc::now().timestamp() + 3600))
            .unwrap();
        assert!(auth.get_session().await.unwrap().is_some());

        auth.sessions()
            .save(&session(Utc::now().timestamp() - 1))
            .unwrap();
        assert!(auth.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_refreshed() {
        let temp_dir = TempDir::new().unwrap();
        let (base_url, server) = serve_once(
            "200 OK",
            r#"{"access_token":"fresh-jwt","token_type":"bearer","expires_in":3600,"refresh_token":"r2","user":{"id":"u-1","email":"a@example.com"}}"#,
        )
        .await;
        let auth = auth_at(&temp_dir, &base_url);

        let mut expired = session(Utc::now().timestamp() - 1);
        expired.refresh_token = Some("r1".to_string());
        auth.sessions().save(&expired).unwrap();

        let refreshed = auth.get_session().await.unwrap().unwrap();
        assert_eq!(refreshed.access_token, "fresh-jwt");
        assert_eq!(refreshed.refresh_token.as_deref(), Some("r2"));
        assert!(!refreshed.is_expired());

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /auth/v1/token?grant_type=refresh_token "));
        assert!(request.contains(r#""refresh_token":"r1""#));

        // The new session replaces the stored one
        let stored = auth.sessions().load().unwrap().unwrap();
        assert_eq!(stored.access_token, "fresh-jwt");
    }

    #[tokio::test]
    async fn test_rejected_refresh_means_signed_out() {
        let temp_dir = TempDir::new().unwrap();
        let (base_url, server) = serve_once(
            "400 Bad Request",
            r#"{"error":"invalid_grant","error_description":"Refresh Token Not Found"}"#,
        )
        .await;
        let auth = auth_at(&temp_dir, &base_url);

        let mut expired = session(Utc::now().timestamp() - 1);
        expired.refresh_token = Some("revoked".to_string());
        auth.sessions().save(&expired).unwrap();

        assert!(auth.get_session().await.unwrap().is_none());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_sign_in_rejects_bad_input_without_request() {
        let temp_dir = TempDir::new().unwrap();
        let auth = auth(&temp_dir);

        let err = auth.sign_in("nobody", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(_)));

        let err = auth.sign_up("a@example.com", "").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(_)));
        assert!(auth.sessions().load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_without_session_clears_locally() {
        let temp_dir = TempDir::new().unwrap();
        let auth = auth(&temp_dir);
        auth.sign_out().await.unwrap();
        assert!(auth.sessions().load().unwrap().is_none());
    }
}
