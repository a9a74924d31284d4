//! Application layer
//!
//! Contains the moderation engine and the pure projections it serves views
//! from. The engine coordinates between domain entities and the
//! collaborator port.

pub mod filter;
pub mod in_flight;
pub mod load_sequencer;
pub mod moderation_engine;
pub mod stats;

pub use filter::{filter_entities, matches_search, StatusFilter, ViewQuery};
pub use in_flight::{InFlightGuard, InFlightRegistry};
pub use load_sequencer::{LoadSequencer, LoadTicket, ViewEpoch};
pub use moderation_engine::{LoadOutcome, ModerationEngine};
pub use stats::{count_by_status, partition_by_flag, sum_metric, FlagPartition, StatusCounts};
