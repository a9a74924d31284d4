//! Ordering of list loads and view abandonment
//!
//! Each load takes a ticket. Only the most recently issued ticket may apply
//! its result; anything older is stale, whatever order responses arrive in.
//! Abandoning the view invalidates every outstanding ticket and bumps the
//! view epoch so in-flight mutations skip their local reconcile.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

/// Issued to a load when it starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// Generation of the view; changes only when the view is abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewEpoch(u64);

#[derive(Debug)]
pub struct LoadSequencer {
    issued: AtomicU64,
    epoch: watch::Sender<u64>,
}

impl LoadSequencer {
    pub fn new() -> Self {
        let (epoch, _) = watch::channel(0);
        Self {
            issued: AtomicU64::new(0),
            epoch,
        }
    }

    /// Start a load; supersedes every earlier ticket
    pub fn begin(&self) -> LoadTicket {
        LoadTicket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket.0
    }

    pub fn epoch(&self) -> ViewEpoch {
        ViewEpoch(*self.epoch.borrow())
    }

    pub fn is_current_epoch(&self, epoch: ViewEpoch) -> bool {
        *self.epoch.borrow() == epoch.0
    }

    /// Resolves its `changed()` when the view is abandoned
    pub fn watch_epoch(&self) -> watch::Receiver<u64> {
        self.epoch.subscribe()
    }

    /// Navigate away: invalidate every outstanding load
    pub fn abandon(&self) {
        self.issued.fetch_add(1, Ordering::SeqCst);
        self.epoch.send_modify(|epoch| *epoch += 1);
    }
}

impl Default for LoadSequencer {
    fn default() -> Self {
        Self::new()
    }
}
