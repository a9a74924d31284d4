//! Summary-card projections over a collection

use serde::Serialize;

use crate::domain::entities::{Entity, Lifecycle};

/// Count per status value, every value present
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCounts<S> {
    pub total: usize,
    pub by_status: Vec<(S, usize)>,
}

impl<S: Lifecycle> StatusCounts<S> {
    pub fn count(&self, status: S) -> usize {
        self.by_status
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

/// Split of a collection by a boolean flag (e.g. online/offline riders)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlagPartition {
    pub set: usize,
    pub unset: usize,
}

pub fn count_by_status<S: Lifecycle>(entities: &[Entity<S>]) -> StatusCounts<S> {
    let by_status = S::ALL
        .iter()
        .map(|&status| {
            let n = entities.iter().filter(|e| e.status == status).count();
            (status, n)
        })
        .collect();

    StatusCounts {
        total: entities.len(),
        by_status,
    }
}

/// Missing flags count as unset
pub fn partition_by_flag<S>(entities: &[Entity<S>], flag: &str) -> FlagPartition {
    entities
        .iter()
        .fold(FlagPartition::default(), |mut acc, e| {
            if e.flags.get(flag).copied().unwrap_or(false) {
                acc.set += 1;
            } else {
                acc.unset += 1;
            }
            acc
        })
}

pub fn sum_metric<S>(entities: &[Entity<S>], metric: &str) -> f64 {
    entities
        .iter()
        .filter_map(|e| e.metrics.get(metric))
        .sum()
}
