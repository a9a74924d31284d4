//! Polling change feed
//!
//! The admin API has no push channel, so realtime is emulated: a task lists
//! the kind on an interval, diffs against the previous poll and emits the
//! differences as change events.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::domain::entities::{Credential, EntityId, EntityKind, EntitySnapshot};
use crate::domain::ports::{ChangeEvent, Collaborator, ListParams, Subscription};
use crate::error::CollaboratorError;

/// Floor for the poll period; `tokio::time::interval` panics on zero
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Spawn a poller over `collaborator` and hand back its subscription.
/// The first poll reports every record as upserted. Intervals below
/// [`MIN_POLL_INTERVAL`] are raised to it.
pub fn spawn_polling_feed<C>(
    collaborator: Arc<C>,
    credential: Credential,
    kind: EntityKind,
    interval: Duration,
    capacity: usize,
) -> Subscription
where
    C: Collaborator + 'static,
{
    let (tx, subscription) = Subscription::channel(kind, capacity);
    let interval = interval.max(MIN_POLL_INTERVAL);

    let producer = tokio::spawn(async move {
        let mut known: HashMap<EntityId, EntitySnapshot> = HashMap::new();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if tx.is_closed() {
                break;
            }

            let fresh = match collaborator
                .list_entities(&credential, kind, &ListParams::default())
                .await
            {
                Ok(fresh) => fresh,
                Err(CollaboratorError::Unauthorized) => {
                    tracing::warn!(kind = %kind, "Change feed credential refused, stopping");
                    break;
                }
                Err(e) => {
                    tracing::warn!(kind = %kind, error = %e, "Change feed poll failed");
                    continue;
                }
            };

            for event in diff_snapshots(&mut known, fresh) {
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        }

        tracing::debug!(kind = %kind, "Polling feed stopped");
    });

    subscription.with_producer(producer)
}

/// Events turning `known` into `fresh`; `known` is updated in place.
/// Upserts keep the order of `fresh`, removals follow.
pub fn diff_snapshots(
    known: &mut HashMap<EntityId, EntitySnapshot>,
    fresh: Vec<EntitySnapshot>,
) -> Vec<ChangeEvent> {
    let mut events = Vec::new();
    let mut next = HashMap::with_capacity(fresh.len());

    for snapshot in fresh {
        let changed = known
            .get(&snapshot.id)
            .map_or(true, |previous| !same_record(previous, &snapshot));
        if changed {
            events.push(ChangeEvent::Upserted(snapshot.clone()));
        }
        next.insert(snapshot.id.clone(), snapshot);
    }

    let mut removed: Vec<_> = known
        .values()
        .filter(|previous| !next.contains_key(&previous.id))
        .map(|previous| ChangeEvent::Removed {
            kind: previous.kind,
            id: previous.id.clone(),
        })
        .collect();
    removed.sort_by(|a, b| a.id().cmp(b.id()));
    events.extend(removed);

    *known = next;
    events
}

// created_at is ignored: records without one get a fresh timestamp per poll
fn same_record(a: &EntitySnapshot, b: &EntitySnapshot) -> bool {
    a.status == b.status
        && a.display_fields == b.display_fields
        && a.metrics == b.metrics
        && a.flags == b.flags
        && a.reason == b.reason
}
