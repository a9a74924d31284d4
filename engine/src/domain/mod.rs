//! Domain layer
//!
//! Contains pure business logic with no external dependencies.
//! - `entities`: Moderatable records, their lifecycles and operator actions
//! - `ports`: Trait definitions for the admin backend

pub mod entities;
pub mod ports;
