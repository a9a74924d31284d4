//! Domain entities
//!
//! Pure domain models for the records an operator moderates.

pub mod action;
pub mod audit;
pub mod credential;
pub mod entity;
pub mod kind;
pub mod status;

pub use action::{Action, TransitionPayload, VERIFIED_FLAG};
pub use audit::AuditEntry;
pub use credential::Credential;
pub use entity::{Entity, EntityId, EntitySnapshot, ORDER_TOTAL_METRIC};
pub use kind::EntityKind;
pub use status::{AccountStatus, Lifecycle, OrderStatus, ORDER_PIPELINE};
