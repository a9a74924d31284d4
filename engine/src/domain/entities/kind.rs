//! Entity kinds managed from the admin dashboard

use serde::{Deserialize, Serialize};

use super::action::Action;

/// Which table of the dashboard an entity belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Restaurant,
    Rider,
    Order,
    User,
}

impl EntityKind {
    pub const ALL: &'static [EntityKind] = &[
        EntityKind::Restaurant,
        EntityKind::Rider,
        EntityKind::Order,
        EntityKind::User,
    ];

    /// Collection name used in admin endpoint paths
    pub fn plural(&self) -> &'static str {
        match self {
            EntityKind::Restaurant => "restaurants",
            EntityKind::Rider => "riders",
            EntityKind::Order => "orders",
            EntityKind::User => "users",
        }
    }

    /// Display fields matched by free-text search
    pub fn search_fields(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Restaurant | EntityKind::Rider | EntityKind::User => &["name", "email"],
            EntityKind::Order => &["order_number", "customer_name"],
        }
    }

    /// Whether operators may request `action` on this kind
    pub fn supports(&self, action: Action) -> bool {
        match self {
            EntityKind::Restaurant => matches!(
                action,
                Action::Approve | Action::Reject | Action::Suspend | Action::Reinstate
            ),
            EntityKind::Rider => matches!(
                action,
                Action::Approve
                    | Action::Reject
                    | Action::Suspend
                    | Action::Reinstate
                    | Action::Verify
            ),
            EntityKind::User => matches!(
                action,
                Action::Approve | Action::Reject | Action::Ban | Action::Unban
            ),
            EntityKind::Order => matches!(action, Action::Cancel | Action::Refund),
        }
    }

    /// Only user accounts can be deleted from the dashboard
    pub fn supports_removal(&self) -> bool {
        matches!(self, EntityKind::User)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Restaurant => write!(f, "restaurant"),
            EntityKind::Rider => write!(f, "rider"),
            EntityKind::Order => write!(f, "order"),
            EntityKind::User => write!(f, "user"),
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "restaurant" | "restaurants" => Ok(EntityKind::Restaurant),
            "rider" | "riders" => Ok(EntityKind::Rider),
            "order" | "orders" => Ok(EntityKind::Order),
            "user" | "users" => Ok(EntityKind::User),
            _ => Err(format!("Unknown entity kind: {}", s)),
        }
    }
}
