//! Operator actions and their payloads

use serde::{Deserialize, Serialize};

/// A mutating operator action, as understood by the admin backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Approve,
    Reject,
    Suspend,
    Reinstate,
    Cancel,
    Refund,
    Ban,
    Unban,
    Verify,
}

/// Flag set by [`Action::Verify`]
pub const VERIFIED_FLAG: &str = "is_verified";

impl Action {
    /// Actions that must carry a non-empty reason
    pub fn requires_reason(&self) -> bool {
        matches!(self, Action::Reject | Action::Cancel | Action::Ban)
    }

    pub fn requires_amount(&self) -> bool {
        matches!(self, Action::Refund)
    }

    /// Boolean flag the action turns on, for actions that leave the status alone
    pub fn sets_flag(&self) -> Option<&'static str> {
        match self {
            Action::Verify => Some(VERIFIED_FLAG),
            _ => None,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::Suspend => "suspend",
            Action::Reinstate => "reinstate",
            Action::Cancel => "cancel",
            Action::Refund => "refund",
            Action::Ban => "ban",
            Action::Unban => "unban",
            Action::Verify => "verify",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "approve" => Ok(Action::Approve),
            "reject" => Ok(Action::Reject),
            "suspend" => Ok(Action::Suspend),
            "reinstate" => Ok(Action::Reinstate),
            "cancel" => Ok(Action::Cancel),
            "refund" => Ok(Action::Refund),
            "ban" => Ok(Action::Ban),
            "unban" => Ok(Action::Unban),
            "verify" => Ok(Action::Verify),
            _ => Err(format!("Unknown action: {}", s)),
        }
    }
}

/// Extra data sent with a transition request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransitionPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

impl TransitionPayload {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            amount: None,
        }
    }

    pub fn amount(amount: f64) -> Self {
        Self {
            reason: None,
            amount: Some(amount),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.reason.is_none() && self.amount.is_none()
    }
}
