//! Admin REST API client

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use urlencoding::encode;

use super::polling::spawn_polling_feed;
use super::record::{decode_audit_log, decode_list, decode_record};
use crate::config::Config;
use crate::domain::entities::{
    Action, AuditEntry, Credential, EntityId, EntityKind, EntitySnapshot, TransitionPayload,
};
use crate::domain::ports::{AuditQuery, Collaborator, DashboardStats, ListParams, Subscription};
use crate::error::CollaboratorError;

/// Implementation of the collaborator port over the admin REST API
#[derive(Clone)]
pub struct HttpCollaborator {
    http: Client,
    base_url: String,
    poll_interval: Duration,
    feed_capacity: usize,
}

impl HttpCollaborator {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, CollaboratorError> {
        let http = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_secs(5),
            feed_capacity: 256,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, CollaboratorError> {
        Ok(Self::new(&config.api_url, config.request_timeout)?
            .with_polling(config.poll_interval, config.feed_capacity))
    }

    /// Interval and buffer size of the polling change feed
    pub fn with_polling(mut self, interval: Duration, capacity: usize) -> Self {
        self.poll_interval = interval;
        self.feed_capacity = capacity;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchange operator email and password for a bearer credential
    pub async fn login(&self, email: &str, password: &str) -> Result<Credential, CollaboratorError> {
        let resp = self
            .http
            .post(self.api_url("/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await?;

        let body: LoginResponse = self.handle_response(resp).await?;
        let token = body
            .token
            .or_else(|| body.data.and_then(|d| d.token))
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                CollaboratorError::Deserialization("login response carried no token".to_string())
            })?;

        tracing::info!(email = %email, "Logged in to admin API");
        Ok(Credential::bearer(token))
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/admin{}", self.base_url, path)
    }

    fn collection_url(&self, kind: EntityKind) -> String {
        self.api_url(&format!("/{}", kind.plural()))
    }

    fn entity_url(&self, kind: EntityKind, id: &EntityId) -> String {
        self.api_url(&format!("/{}/{}", kind.plural(), encode(id.as_str())))
    }

    fn authorized(&self, request: RequestBuilder, credential: &Credential) -> RequestBuilder {
        request.header("Authorization", credential.authorization())
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, CollaboratorError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| CollaboratorError::Deserialization(e.to_string()))
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(error_for_status(status, message))
        }
    }

    async fn handle_empty_response(
        &self,
        response: reqwest::Response,
    ) -> Result<(), CollaboratorError> {
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(error_for_status(status, message))
        }
    }
}

/// Map a non-success status onto the adapter error
fn error_for_status(status: StatusCode, message: String) -> CollaboratorError {
    match status.as_u16() {
        401 | 403 => CollaboratorError::Unauthorized,
        404 => CollaboratorError::NotFound(message),
        409 | 422 => CollaboratorError::Rejected(message),
        code => CollaboratorError::Api {
            status: code,
            message,
        },
    }
}

/// Path segment of the endpoint performing `action` on `kind`
fn action_path(kind: EntityKind, action: Action) -> Result<&'static str, CollaboratorError> {
    if !kind.supports(action) {
        return Err(CollaboratorError::Rejected(format!(
            "the admin API cannot {} a {}",
            action, kind
        )));
    }
    Ok(match action {
        Action::Approve => "approve",
        Action::Reject => "reject",
        // The API exposes a single toggle for both directions
        Action::Suspend | Action::Reinstate => "toggle-status",
        Action::Cancel => "cancel",
        Action::Refund => "refund",
        Action::Ban => "ban",
        Action::Unban => "unban",
        Action::Verify => "verify",
    })
}

/// Request types for the admin API
#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Response types from the admin API
#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default, alias = "accessToken", alias = "access_token")]
    token: Option<String>,
    #[serde(default)]
    data: Option<LoginData>,
}

#[derive(Deserialize)]
struct LoginData {
    #[serde(default, alias = "accessToken", alias = "access_token")]
    token: Option<String>,
}

#[derive(Deserialize)]
struct StatsEnvelope {
    data: DashboardStats,
}

#[async_trait]
impl Collaborator for HttpCollaborator {
    async fn list_entities(
        &self,
        credential: &Credential,
        kind: EntityKind,
        params: &ListParams,
    ) -> Result<Vec<EntitySnapshot>, CollaboratorError> {
        let resp = self
            .authorized(self.http.get(self.collection_url(kind)), credential)
            .query(params)
            .send()
            .await?;

        let body: Value = self.handle_response(resp).await?;
        decode_list(kind, body)
    }

    async fn get_entity(
        &self,
        credential: &Credential,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<Option<EntitySnapshot>, CollaboratorError> {
        let resp = self
            .authorized(self.http.get(self.entity_url(kind, id)), credential)
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body: Value = self.handle_response(resp).await?;
        decode_record(kind, body).map(Some)
    }

    async fn transition(
        &self,
        credential: &Credential,
        kind: EntityKind,
        id: &EntityId,
        action: Action,
        payload: &TransitionPayload,
    ) -> Result<(), CollaboratorError> {
        let url = format!("{}/{}", self.entity_url(kind, id), action_path(kind, action)?);
        let mut request = self.authorized(self.http.post(url), credential);
        if !payload.is_empty() {
            request = request.json(payload);
        }

        let resp = request.send().await?;
        self.handle_empty_response(resp).await
    }

    async fn remove_entity(
        &self,
        credential: &Credential,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<(), CollaboratorError> {
        if !kind.supports_removal() {
            return Err(CollaboratorError::Rejected(format!(
                "the admin API cannot remove a {}",
                kind
            )));
        }
        let resp = self
            .authorized(self.http.delete(self.entity_url(kind, id)), credential)
            .send()
            .await?;

        self.handle_empty_response(resp).await
    }

    async fn dashboard_stats(
        &self,
        credential: &Credential,
    ) -> Result<DashboardStats, CollaboratorError> {
        let resp = self
            .authorized(self.http.get(self.api_url("/stats")), credential)
            .send()
            .await?;

        let body: Value = self.handle_response(resp).await?;
        parse_stats(body)
    }

    async fn audit_log(
        &self,
        credential: &Credential,
        query: &AuditQuery,
    ) -> Result<Vec<AuditEntry>, CollaboratorError> {
        let resp = self
            .authorized(self.http.get(self.api_url("/audit-logs")), credential)
            .query(query)
            .send()
            .await?;

        let body: Value = self.handle_response(resp).await?;
        decode_audit_log(body)
    }

    async fn subscribe(
        &self,
        credential: &Credential,
        kind: EntityKind,
    ) -> Result<Subscription, CollaboratorError> {
        tracing::debug!(kind = %kind, interval = ?self.poll_interval, "Starting polling change feed");
        Ok(spawn_polling_feed(
            Arc::new(self.clone()),
            credential.clone(),
            kind,
            self.poll_interval,
            self.feed_capacity,
        ))
    }
}

/// Stats may come bare or inside `{ "data": {...} }`
fn parse_stats(body: Value) -> Result<DashboardStats, CollaboratorError> {
    let parsed = if body.get("data").is_some_and(Value::is_object) {
        serde_json::from_value::<StatsEnvelope>(body).map(|e| e.data)
    } else {
        serde_json::from_value(body)
    };
    parsed.map_err(|e| CollaboratorError::Deserialization(e.to_string()))
}
