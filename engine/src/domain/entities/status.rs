//! Status lifecycles
//!
//! Two state machines share one engine:
//!
//! Accounts (restaurants, riders, users):
//!   pending → {approved, rejected}, approved ↔ suspended, rejected is terminal.
//!   Verification keeps the status and is refused once rejected.
//!
//! Orders:
//!   pending → preparing → ready → picked_up → delivered, plus * → cancelled
//!   from any non-terminal state. delivered and cancelled are terminal.
//!
//! Status strings are parsed strictly: only the canonical lowercase form is
//! accepted, so `"Approved"` is not a status.

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::action::Action;
use super::kind::EntityKind;

/// A status enum governed by a transition table
pub trait Lifecycle:
    Copy + Eq + Hash + fmt::Debug + fmt::Display + FromStr<Err = String> + Send + Sync + 'static
{
    /// Every status value, in display order
    const ALL: &'static [Self];

    /// Whether entities of `kind` use this lifecycle
    fn applies_to(kind: EntityKind) -> bool;

    /// Status after `action`, or `None` if the action is not allowed from here
    fn target(self, action: Action) -> Option<Self>;

    fn is_terminal(self) -> bool;
}

/// Onboarding status of restaurants, riders and users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Pending,
    Approved,
    Rejected,
    Suspended,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStatus::Pending => write!(f, "pending"),
            AccountStatus::Approved => write!(f, "approved"),
            AccountStatus::Rejected => write!(f, "rejected"),
            AccountStatus::Suspended => write!(f, "suspended"),
        }
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AccountStatus::Pending),
            "approved" => Ok(AccountStatus::Approved),
            "rejected" => Ok(AccountStatus::Rejected),
            "suspended" => Ok(AccountStatus::Suspended),
            _ => Err(format!("Unknown account status: {}", s)),
        }
    }
}

impl Lifecycle for AccountStatus {
    const ALL: &'static [Self] = &[
        AccountStatus::Pending,
        AccountStatus::Approved,
        AccountStatus::Rejected,
        AccountStatus::Suspended,
    ];

    fn applies_to(kind: EntityKind) -> bool {
        kind != EntityKind::Order
    }

    fn target(self, action: Action) -> Option<Self> {
        use AccountStatus::*;
        match (self, action) {
            (Pending, Action::Approve) => Some(Approved),
            (Pending, Action::Reject) => Some(Rejected),
            (Approved, Action::Suspend | Action::Ban) => Some(Suspended),
            (Suspended, Action::Reinstate | Action::Unban) => Some(Approved),
            (Pending | Approved | Suspended, Action::Verify) => Some(self),
            _ => None,
        }
    }

    fn is_terminal(self) -> bool {
        self == AccountStatus::Rejected
    }
}

/// Delivery status of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    PickedUp,
    Delivered,
    Cancelled,
}

/// The linear fulfilment pipeline. Cancellation sits outside it.
pub const ORDER_PIPELINE: &[OrderStatus] = &[
    OrderStatus::Pending,
    OrderStatus::Preparing,
    OrderStatus::Ready,
    OrderStatus::PickedUp,
    OrderStatus::Delivered,
];

impl OrderStatus {
    /// Next stage of the pipeline, `None` once delivered or cancelled
    pub fn next(self) -> Option<Self> {
        let index = ORDER_PIPELINE.iter().position(|&s| s == self)?;
        ORDER_PIPELINE.get(index + 1).copied()
    }

    /// Refunds are only issued for settled orders
    pub fn is_refundable(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Preparing => write!(f, "preparing"),
            OrderStatus::Ready => write!(f, "ready"),
            OrderStatus::PickedUp => write!(f, "picked_up"),
            OrderStatus::Delivered => write!(f, "delivered"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "preparing" => Ok(OrderStatus::Preparing),
            "ready" => Ok(OrderStatus::Ready),
            "picked_up" => Ok(OrderStatus::PickedUp),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(format!("Unknown order status: {}", s)),
        }
    }
}

impl Lifecycle for OrderStatus {
    const ALL: &'static [Self] = &[
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::PickedUp,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    fn applies_to(kind: EntityKind) -> bool {
        kind == EntityKind::Order
    }

    fn target(self, action: Action) -> Option<Self> {
        match action {
            Action::Cancel if !self.is_terminal() => Some(OrderStatus::Cancelled),
            Action::Refund if self.is_refundable() => Some(self),
            _ => None,
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_keeps_status_unless_rejected() {
        for status in [
            AccountStatus::Pending,
            AccountStatus::Approved,
            AccountStatus::Suspended,
        ] {
            assert_eq!(status.target(Action::Verify), Some(status));
        }
        assert_eq!(AccountStatus::Rejected.target(Action::Verify), None);
        assert_eq!(OrderStatus::Delivered.target(Action::Verify), None);
    }

    #[test]
    fn pending_account_can_be_approved_or_rejected() {
        assert_eq!(
            AccountStatus::Pending.target(Action::Approve),
            Some(AccountStatus::Approved)
        );
        assert_eq!(
            AccountStatus::Pending.target(Action::Reject),
            Some(AccountStatus::Rejected)
        );
    }

    #[test]
    fn approve_only_from_pending() {
        for status in [
            AccountStatus::Approved,
            AccountStatus::Rejected,
            AccountStatus::Suspended,
        ] {
            assert_eq!(status.target(Action::Approve), None, "from {}", status);
            assert_eq!(status.target(Action::Reject), None, "from {}", status);
        }
    }

    #[test]
    fn approved_and_suspended_toggle() {
        assert_eq!(
            AccountStatus::Approved.target(Action::Suspend),
            Some(AccountStatus::Suspended)
        );
        assert_eq!(
            AccountStatus::Suspended.target(Action::Reinstate),
            Some(AccountStatus::Approved)
        );
        assert_eq!(
            AccountStatus::Approved.target(Action::Ban),
            Some(AccountStatus::Suspended)
        );
        assert_eq!(
            AccountStatus::Suspended.target(Action::Unban),
            Some(AccountStatus::Approved)
        );
    }

    #[test]
    fn suspend_not_valid_from_pending_or_rejected() {
        assert_eq!(AccountStatus::Pending.target(Action::Suspend), None);
        assert_eq!(AccountStatus::Rejected.target(Action::Suspend), None);
        assert_eq!(AccountStatus::Rejected.target(Action::Reinstate), None);
    }

    #[test]
    fn no_action_returns_an_account_to_pending() {
        for &status in AccountStatus::ALL {
            for action in [
                Action::Approve,
                Action::Reject,
                Action::Suspend,
                Action::Reinstate,
                Action::Ban,
                Action::Unban,
            ] {
                assert_ne!(status.target(action), Some(AccountStatus::Pending));
            }
        }
    }

    #[test]
    fn only_rejected_is_terminal_for_accounts() {
        assert!(AccountStatus::Rejected.is_terminal());
        assert!(!AccountStatus::Suspended.is_terminal());
    }

    #[test]
    fn account_status_parsing_is_case_sensitive() {
        assert_eq!(
            "approved".parse::<AccountStatus>().unwrap(),
            AccountStatus::Approved
        );
        assert!("Approved".parse::<AccountStatus>().is_err());
        assert!("APPROVED".parse::<AccountStatus>().is_err());
    }

    #[test]
    fn order_pipeline_is_linear() {
        assert_eq!(OrderStatus::Pending.next(), Some(OrderStatus::Preparing));
        assert_eq!(OrderStatus::Preparing.next(), Some(OrderStatus::Ready));
        assert_eq!(OrderStatus::Ready.next(), Some(OrderStatus::PickedUp));
        assert_eq!(OrderStatus::PickedUp.next(), Some(OrderStatus::Delivered));
        assert_eq!(OrderStatus::Delivered.next(), None);
        assert_eq!(OrderStatus::Cancelled.next(), None);
    }

    #[test]
    fn cancel_allowed_from_every_non_terminal_order() {
        for &status in &ORDER_PIPELINE[..4] {
            assert_eq!(status.target(Action::Cancel), Some(OrderStatus::Cancelled));
        }
        assert_eq!(OrderStatus::Delivered.target(Action::Cancel), None);
        assert_eq!(OrderStatus::Cancelled.target(Action::Cancel), None);
    }

    #[test]
    fn refund_keeps_status_and_needs_settled_order() {
        assert_eq!(
            OrderStatus::Delivered.target(Action::Refund),
            Some(OrderStatus::Delivered)
        );
        assert_eq!(
            OrderStatus::Cancelled.target(Action::Refund),
            Some(OrderStatus::Cancelled)
        );
        assert_eq!(OrderStatus::PickedUp.target(Action::Refund), None);
    }

    #[test]
    fn order_status_display_uses_snake_case() {
        assert_eq!(OrderStatus::PickedUp.to_string(), "picked_up");
        assert_eq!(
            "picked_up".parse::<OrderStatus>().unwrap(),
            OrderStatus::PickedUp
        );
        assert_eq!(
            serde_json::to_string(&OrderStatus::PickedUp).unwrap(),
            r#""picked_up""#
        );
    }

    #[test]
    fn lifecycles_split_kinds() {
        assert!(AccountStatus::applies_to(EntityKind::Rider));
        assert!(!AccountStatus::applies_to(EntityKind::Order));
        assert!(OrderStatus::applies_to(EntityKind::Order));
        assert!(!OrderStatus::applies_to(EntityKind::User));
    }
}
