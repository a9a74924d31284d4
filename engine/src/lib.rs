//! FoodDash moderation engine
//!
//! Back-office workflow engine for a food-delivery platform: operators
//! review restaurants, riders, orders and users, and drive them through
//! their status lifecycles against the admin backend.
//! Uses hexagonal (ports & adapters) architecture for clean separation of concerns.

pub mod adapters;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

#[cfg(test)]
mod test_utils;

pub use adapters::HttpCollaborator;
pub use app::{LoadOutcome, ModerationEngine, StatusFilter, ViewQuery};
pub use config::Config;
pub use domain::entities::{
    AccountStatus, AuditEntry, Credential, EntityId, EntityKind, OrderStatus,
};
pub use domain::ports::AuditQuery;
pub use error::{CollaboratorError, ConfigError, ModerationError};
