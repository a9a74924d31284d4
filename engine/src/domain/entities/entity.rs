//! Moderatable entity
//!
//! `EntitySnapshot` is what the backend hands out: a point-in-time record
//! with its status as a plain string. `Entity<S>` is the same record with the
//! status parsed into a lifecycle the engine can drive.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::kind::EntityKind;
use super::status::{Lifecycle, OrderStatus};

/// Metric holding an order's monetary total
pub const ORDER_TOTAL_METRIC: &str = "total";

/// Opaque identifier assigned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Untyped record as delivered by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKind,
    pub status: String,
    #[serde(default)]
    pub display_fields: BTreeMap<String, String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
    /// Audit reason of the last reject/cancel/ban
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl EntitySnapshot {
    pub fn new(kind: EntityKind, id: impl Into<EntityId>, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            status: status.into(),
            display_fields: BTreeMap::new(),
            metrics: BTreeMap::new(),
            flags: BTreeMap::new(),
            reason: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.display_fields.insert(name.to_string(), value.into());
        self
    }

    pub fn with_metric(mut self, name: &str, value: f64) -> Self {
        self.metrics.insert(name.to_string(), value);
        self
    }

    pub fn with_flag(mut self, name: &str, value: bool) -> Self {
        self.flags.insert(name.to_string(), value);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// A snapshot whose status belongs to lifecycle `S`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity<S> {
    pub id: EntityId,
    pub kind: EntityKind,
    pub status: S,
    pub display_fields: BTreeMap<String, String>,
    /// Informational numbers (rating, revenue, ...); never drive transitions
    pub metrics: BTreeMap<String, f64>,
    pub flags: BTreeMap<String, bool>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl<S: Lifecycle> Entity<S> {
    /// Parse a snapshot's status into `S`
    pub fn from_snapshot(snapshot: EntitySnapshot) -> Result<Self, String> {
        if !S::applies_to(snapshot.kind) {
            return Err(format!(
                "{} {} does not use this status lifecycle",
                snapshot.kind, snapshot.id
            ));
        }
        let status = snapshot.status.parse::<S>()?;
        Ok(Self {
            id: snapshot.id,
            kind: snapshot.kind,
            status,
            display_fields: snapshot.display_fields,
            metrics: snapshot.metrics,
            flags: snapshot.flags,
            reason: snapshot.reason,
            created_at: snapshot.created_at,
        })
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.display_fields.get(name).map(String::as_str)
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// Missing flags read as false
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    /// Human-readable label for messages
    pub fn label(&self) -> &str {
        self.field("name")
            .or_else(|| self.field("order_number"))
            .unwrap_or(self.id.as_str())
    }
}

impl Entity<OrderStatus> {
    /// Order total; orders without one cannot be refunded
    pub fn total(&self) -> f64 {
        self.metric(ORDER_TOTAL_METRIC).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::AccountStatus;

    #[test]
    fn snapshot_converts_into_typed_entity() {
        let snapshot = EntitySnapshot::new(EntityKind::Restaurant, "1", "approved")
            .with_field("name", "Pizza Paradise")
            .with_metric("rating", 4.8)
            .with_flag("is_open", true);

        let entity = Entity::<AccountStatus>::from_snapshot(snapshot).unwrap();
        assert_eq!(entity.status, AccountStatus::Approved);
        assert_eq!(entity.field("name"), Some("Pizza Paradise"));
        assert_eq!(entity.metric("rating"), Some(4.8));
        assert!(entity.flag("is_open"));
        assert!(!entity.flag("is_online"));
        assert_eq!(entity.label(), "Pizza Paradise");
    }

    #[test]
    fn unknown_status_is_rejected() {
        let snapshot = EntitySnapshot::new(EntityKind::Rider, "2", "ACTIVE");
        assert!(Entity::<AccountStatus>::from_snapshot(snapshot).is_err());
    }

    #[test]
    fn lifecycle_must_match_kind() {
        let snapshot = EntitySnapshot::new(EntityKind::Order, "3", "pending");
        assert!(Entity::<AccountStatus>::from_snapshot(snapshot.clone()).is_err());
        assert!(Entity::<OrderStatus>::from_snapshot(snapshot).is_ok());
    }

    #[test]
    fn order_total_defaults_to_zero() {
        let with_total = EntitySnapshot::new(EntityKind::Order, "1", "delivered")
            .with_metric(ORDER_TOTAL_METRIC, 45.5);
        let without_total = EntitySnapshot::new(EntityKind::Order, "2", "delivered");

        assert_eq!(
            Entity::<OrderStatus>::from_snapshot(with_total).unwrap().total(),
            45.5
        );
        assert_eq!(
            Entity::<OrderStatus>::from_snapshot(without_total).unwrap().total(),
            0.0
        );
    }

    #[test]
    fn label_falls_back_to_id() {
        let snapshot = EntitySnapshot::new(EntityKind::User, "u-9", "approved");
        let entity = Entity::<AccountStatus>::from_snapshot(snapshot).unwrap();
        assert_eq!(entity.label(), "u-9");
    }

    #[test]
    fn entity_id_serializes_transparently() {
        let id = EntityId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""abc""#);
        assert_eq!(id.to_string(), "abc");
    }
}
