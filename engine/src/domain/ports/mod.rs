//! Domain ports (traits)
//!
//! Port traits define interfaces that the domain layer requires.
//! Adapters provide concrete implementations of these traits.

pub mod collaborator;
pub mod realtime;

pub use collaborator::{AuditQuery, Collaborator, DashboardStats, ListParams};
pub use realtime::{ChangeEvent, Subscription};
