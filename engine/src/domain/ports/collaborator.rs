//! Admin backend port
//!
//! The backend owns persistence, auth and realtime push. The engine only
//! reads snapshots from it and asks it to perform transitions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::realtime::Subscription;
use crate::domain::entities::{
    Action, AuditEntry, Credential, EntityId, EntityKind, EntitySnapshot, TransitionPayload,
};
use crate::error::CollaboratorError;

/// Server-side filters for a list request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl ListParams {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            search: None,
        }
    }
}

/// Filters for the audit trail; sent as query parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl AuditQuery {
    /// Everything recorded about one record
    pub fn for_entity(kind: EntityKind, id: impl Into<EntityId>) -> Self {
        Self {
            entity_type: Some(kind),
            entity_id: Some(id.into()),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Dashboard summary computed by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub total_restaurants: u64,
    pub active_restaurants: u64,
    pub pending_restaurants: u64,
    pub total_riders: u64,
    pub active_riders: u64,
    pub pending_riders: u64,
    pub today_orders: u64,
    pub today_revenue: f64,
    pub total_orders: u64,
    pub total_revenue: f64,
}

/// Persistence, auth and realtime collaborator
#[async_trait]
pub trait Collaborator: Send + Sync {
    /// List snapshots of one kind
    async fn list_entities(
        &self,
        credential: &Credential,
        kind: EntityKind,
        params: &ListParams,
    ) -> Result<Vec<EntitySnapshot>, CollaboratorError>;

    /// Fetch a single snapshot, `None` if the id is unknown
    async fn get_entity(
        &self,
        credential: &Credential,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<Option<EntitySnapshot>, CollaboratorError>;

    /// Ask the backend to perform a status transition
    async fn transition(
        &self,
        credential: &Credential,
        kind: EntityKind,
        id: &EntityId,
        action: Action,
        payload: &TransitionPayload,
    ) -> Result<(), CollaboratorError>;

    /// Delete a record
    async fn remove_entity(
        &self,
        credential: &Credential,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<(), CollaboratorError>;

    /// Summary counters for the dashboard landing page
    async fn dashboard_stats(
        &self,
        credential: &Credential,
    ) -> Result<DashboardStats, CollaboratorError>;

    /// Recorded operator actions matching `query`
    async fn audit_log(
        &self,
        credential: &Credential,
        query: &AuditQuery,
    ) -> Result<Vec<AuditEntry>, CollaboratorError>;

    /// Open a change feed for one kind
    async fn subscribe(
        &self,
        credential: &Credential,
        kind: EntityKind,
    ) -> Result<Subscription, CollaboratorError>;
}
