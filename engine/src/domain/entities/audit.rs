//! Audit trail entries
//!
//! The backend records every operator action. Entries are read-only here.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::entity::EntityId;
use super::kind::EntityKind;

/// One recorded operator action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub id: String,
    /// Backend action name, e.g. "reject" or "toggle-status"
    pub action: String,
    pub entity_kind: Option<EntityKind>,
    pub entity_id: Option<EntityId>,
    /// Who performed it, usually the operator's email
    pub actor: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            action: action.into(),
            entity_kind: None,
            entity_id: None,
            actor: None,
            reason: None,
            created_at: Utc::now(),
        }
    }

    pub fn on(mut self, kind: EntityKind, id: impl Into<EntityId>) -> Self {
        self.entity_kind = Some(kind);
        self.entity_id = Some(id.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Whether the entry is about `kind`/`id`; unset filters match anything
    pub fn concerns(&self, kind: Option<EntityKind>, id: Option<&EntityId>) -> bool {
        kind.map_or(true, |k| self.entity_kind == Some(k))
            && id.map_or(true, |id| self.entity_id.as_ref() == Some(id))
    }
}
