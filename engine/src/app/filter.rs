//! Status filter and free-text search over a fetched collection
//!
//! Pure functions: they never touch the network and keep the order of the
//! collection.

use std::fmt;
use std::str::FromStr;

use crate::domain::entities::{Entity, Lifecycle};

/// Status dropdown of a list view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter<S> {
    All,
    Only(S),
}

impl<S> Default for StatusFilter<S> {
    fn default() -> Self {
        StatusFilter::All
    }
}

impl<S: Lifecycle> StatusFilter<S> {
    pub fn matches(&self, status: S) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }

    /// Value sent as the `status` list parameter
    pub fn as_param(&self) -> Option<String> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Only(status) => Some(status.to_string()),
        }
    }
}

impl<S: Lifecycle> fmt::Display for StatusFilter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => write!(f, "all"),
            StatusFilter::Only(status) => write!(f, "{}", status),
        }
    }
}

impl<S: Lifecycle> FromStr for StatusFilter<S> {
    type Err = String;

    /// `"all"` or the canonical status string, case-sensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(StatusFilter::All);
        }
        s.parse::<S>().map(StatusFilter::Only)
    }
}

/// Status filter plus search box of a list view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery<S> {
    pub status: StatusFilter<S>,
    pub search: String,
}

impl<S> Default for ViewQuery<S> {
    fn default() -> Self {
        Self {
            status: StatusFilter::All,
            search: String::new(),
        }
    }
}

impl<S: Lifecycle> ViewQuery<S> {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: StatusFilter<S>) -> Self {
        self.status = status;
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }
}

/// Case-insensitive substring match against the given display fields.
/// An empty query matches everything.
pub fn matches_search<S>(entity: &Entity<S>, query: &str, fields: &[&str]) -> bool {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return true;
    }
    fields.iter().any(|field| {
        entity
            .display_fields
            .get(*field)
            .map(|value| value.to_lowercase().contains(&needle))
            .unwrap_or(false)
    })
}

/// Apply status filter AND search, preserving order
pub fn filter_entities<'a, S: Lifecycle>(
    entities: &'a [Entity<S>],
    status: &StatusFilter<S>,
    query: &str,
    fields: &[&str],
) -> Vec<&'a Entity<S>> {
    entities
        .iter()
        .filter(|e| status.matches(e.status))
        .filter(|e| matches_search(e, query, fields))
        .collect()
}
