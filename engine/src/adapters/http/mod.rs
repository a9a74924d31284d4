//! Admin REST API adapter
//!
//! Implementation of the collaborator port over HTTP, with a polling change
//! feed standing in for push.

pub mod client;
pub mod polling;
pub mod record;

pub use client::HttpCollaborator;
pub use polling::{diff_snapshots, spawn_polling_feed};
pub use record::{decode_list, decode_record};
