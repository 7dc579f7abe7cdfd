//! Supabase-style backend client
//!
//! Rows go through PostgREST at `{api_url}/rest/v1/{table}`; change
//! notifications come from the realtime websocket (see [`super::realtime`]).
//! Requests carry the project's anon key plus the signed-in user's access
//! token, so row-level security on the server restricts rows to their owner.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use tracing::debug;

use super::error::RemoteError;
use super::query::{Query, RowFilter};
use super::realtime::{self, ChannelConfig};
use super::{RemoteStore, Subscription};
use crate::config::Config;
use crate::models::{NewTodo, Todo, TodoPatch};

/// Database schema holding the todo table
const SCHEMA: &str = "public";

/// Remote store backed by PostgREST + realtime
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    http: Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    table: String,
}

impl SupabaseStore {
    /// Create a client for the given project
    pub fn new(
        base_url: &str,
        api_key: &str,
        table: &str,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            access_token: None,
            table: table.to_string(),
        })
    }

    /// Create a client from configuration
    pub fn from_config(config: &Config) -> Result<Self, RemoteError> {
        let base_url = config
            .api_url
            .as_deref()
            .ok_or(RemoteError::NotConfigured("api_url"))?;
        let api_key = config
            .anon_key
            .as_deref()
            .ok_or(RemoteError::NotConfigured("anon_key"))?;
        Self::new(base_url, api_key, &config.table, config.request_timeout())
    }

    /// Act on behalf of a signed-in user
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn rest_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    /// Websocket endpoint for realtime change notifications
    pub fn realtime_url(&self) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.base_url.clone()
        };
        format!(
            "{}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            ws_base, self.api_key
        )
    }

    fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.api_key)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.bearer()))
            .header(header::CONTENT_TYPE, "application/json")
    }

    /// Turn a non-success response into an error carrying the body
    async fn check(resp: Response) -> Result<Response, RemoteError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(RemoteError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RemoteStore for SupabaseStore {
    async fn select(&self, query: &Query) -> Result<Vec<Todo>, RemoteError> {
        debug!("GET {} {:?}", self.table, query.filter.to_param());
        let resp = self
            .request(Method::GET, &self.rest_url())
            .query(&query.to_params())
            .send()
            .await?;
        let body = Self::check(resp).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn insert(&self, row: &NewTodo) -> Result<(), RemoteError> {
        debug!("POST {}", self.table);
        let resp = self
            .request(Method::POST, &self.rest_url())
            .header("Prefer", "return=minimal")
            .json(&[row])
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn update(&self, id: &str, patch: &TodoPatch) -> Result<(), RemoteError> {
        debug!("PATCH {} id={}", self.table, id);
        let resp = self
            .request(Method::PATCH, &self.rest_url())
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        debug!("DELETE {} id={}", self.table, id);
        let resp = self
            .request(Method::DELETE, &self.rest_url())
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn subscribe(&self, filter: &RowFilter) -> Result<Subscription, RemoteError> {
        let config = ChannelConfig {
            url: self.realtime_url(),
            schema: SCHEMA.to_string(),
            table: self.table.clone(),
            filter: filter.to_realtime(),
            access_token: self.access_token.clone(),
        };
        realtime::subscribe(config).await
    }
}
