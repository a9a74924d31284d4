//! At most one in-flight transition per entity id

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use crate::domain::entities::EntityId;

/// Ids with a mutating call currently outstanding
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    ids: Mutex<HashSet<EntityId>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `id`, or `None` if another transition already holds it
    pub fn try_acquire(&self, id: &EntityId) -> Option<InFlightGuard<'_>> {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        if !ids.insert(id.clone()) {
            return None;
        }
        Some(InFlightGuard {
            registry: self,
            id: id.clone(),
        })
    }

    pub fn is_in_flight(&self, id: &EntityId) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    fn release(&self, id: &EntityId) {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }
}

/// Releases the id on drop, whatever path the transition took
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    registry: &'a InFlightRegistry,
    id: EntityId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.id);
    }
}
