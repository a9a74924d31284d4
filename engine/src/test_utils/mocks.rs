//! Mock implementation of the collaborator port
//!
//! An in-memory admin backend that can be configured for testing. It stores
//! snapshots in insertion order, applies transitions with the same rules as
//! the real backend, and records every call so tests can verify behavior.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{mpsc, Notify};

use crate::domain::entities::{
    AccountStatus, Action, AuditEntry, Credential, EntityId, EntityKind, EntitySnapshot,
    Lifecycle, OrderStatus, TransitionPayload,
};
use crate::domain::ports::{
    AuditQuery, ChangeEvent, Collaborator, DashboardStats, ListParams, Subscription,
};
use crate::error::CollaboratorError;

/// A transition request as the backend received it
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionCall {
    pub kind: EntityKind,
    pub id: EntityId,
    pub action: Action,
    pub payload: TransitionPayload,
}

// ============================================================================
// In-Memory Collaborator
// ============================================================================

#[derive(Default)]
pub struct InMemoryCollaborator {
    records: Arc<RwLock<Vec<EntitySnapshot>>>,
    dashboard: DashboardStats,
    accepted_token: Option<String>,
    failing: AtomicBool,
    transition_delay: bool,
    fail_reads_after_transition: bool,
    list_gate: Mutex<Option<Arc<Notify>>>,
    transition_gate: Mutex<Option<Arc<Notify>>>,
    list_calls: Mutex<Vec<ListParams>>,
    get_calls: AtomicUsize,
    transitions: Mutex<Vec<TransitionCall>>,
    removed: Mutex<Vec<(EntityKind, EntityId)>>,
    audit: Mutex<Vec<AuditEntry>>,
    subscribers: Mutex<Vec<(EntityKind, mpsc::Sender<ChangeEvent>)>>,
}

impl InMemoryCollaborator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with a record for testing
    pub fn with_snapshot(self, snapshot: EntitySnapshot) -> Self {
        self.records.write().unwrap().push(snapshot);
        self
    }

    /// Pre-populate the audit trail (oldest first)
    pub fn with_audit_entry(self, entry: AuditEntry) -> Self {
        self.audit.lock().unwrap().push(entry);
        self
    }

    pub fn with_dashboard_stats(mut self, stats: DashboardStats) -> Self {
        self.dashboard = stats;
        self
    }

    /// Refuse every token except this one
    pub fn with_accepted_token(mut self, token: &str) -> Self {
        self.accepted_token = Some(token.to_string());
        self
    }

    /// Yield once inside `transition` so concurrent callers interleave
    pub fn with_transition_delay(mut self) -> Self {
        self.transition_delay = true;
        self
    }

    /// `get_entity` errors once any transition has been applied
    pub fn with_failing_reads_after_transition(mut self) -> Self {
        self.fail_reads_after_transition = true;
        self
    }

    /// Create a mock that fails every call
    pub fn failing() -> Self {
        let mock = Self::default();
        mock.set_failing(true);
        mock
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Overwrite a stored status behind the engine's back
    pub fn set_status(&self, kind: EntityKind, id: &str, status: &str) {
        let mut records = self.records.write().unwrap();
        if let Some(record) = records
            .iter_mut()
            .find(|r| r.kind == kind && r.id.as_str() == id)
        {
            record.status = status.to_string();
        }
    }

    /// Park list calls until the returned handle is notified
    pub fn hold_lists(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.list_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Park transition calls until the returned handle is notified
    pub fn hold_transitions(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.transition_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Send an event to every open feed of its kind
    pub fn push(&self, event: ChangeEvent) {
        let subscribers = self.subscribers.lock().unwrap();
        for (kind, tx) in subscribers.iter() {
            if *kind == event.kind() {
                let _ = tx.try_send(event.clone());
            }
        }
    }

    /// Close every open feed
    pub fn close_feeds(&self) {
        self.subscribers.lock().unwrap().clear();
    }

    pub fn list_calls(&self) -> Vec<ListParams> {
        self.list_calls.lock().unwrap().clone()
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn transitions(&self) -> Vec<TransitionCall> {
        self.transitions.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<(EntityKind, EntityId)> {
        self.removed.lock().unwrap().clone()
    }

    fn check(&self, credential: &Credential) -> Result<(), CollaboratorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable(
                "mock backend is down".to_string(),
            ));
        }
        match &self.accepted_token {
            Some(token) if token != credential.token() => Err(CollaboratorError::Unauthorized),
            _ => Ok(()),
        }
    }

    fn find(&self, kind: EntityKind, id: &EntityId) -> Option<EntitySnapshot> {
        self.records
            .read()
            .unwrap()
            .iter()
            .find(|r| r.kind == kind && &r.id == id)
            .cloned()
    }
}

/// Status string after `action`, or `None` when the backend would refuse it
fn next_status(kind: EntityKind, status: &str, action: Action) -> Option<String> {
    if OrderStatus::applies_to(kind) {
        let current: OrderStatus = status.parse().ok()?;
        current.target(action).map(|s| s.to_string())
    } else {
        let current: AccountStatus = status.parse().ok()?;
        current.target(action).map(|s| s.to_string())
    }
}

#[async_trait]
impl Collaborator for InMemoryCollaborator {
    async fn list_entities(
        &self,
        credential: &Credential,
        kind: EntityKind,
        params: &ListParams,
    ) -> Result<Vec<EntitySnapshot>, CollaboratorError> {
        self.list_calls.lock().unwrap().push(params.clone());
        let gate = self.list_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check(credential)?;

        let search = params.search.as_deref().map(str::to_lowercase);
        let records = self.records.read().unwrap();
        Ok(records
            .iter()
            .filter(|r| r.kind == kind)
            .filter(|r| params.status.as_deref().map_or(true, |s| r.status == s))
            .filter(|r| {
                search.as_deref().map_or(true, |needle| {
                    kind.search_fields().iter().any(|field| {
                        r.display_fields
                            .get(*field)
                            .is_some_and(|v| v.to_lowercase().contains(needle))
                    })
                })
            })
            .cloned()
            .collect())
    }

    async fn get_entity(
        &self,
        credential: &Credential,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<Option<EntitySnapshot>, CollaboratorError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check(credential)?;
        if self.fail_reads_after_transition && !self.transitions.lock().unwrap().is_empty() {
            return Err(CollaboratorError::Unavailable(
                "read replica lagging".to_string(),
            ));
        }
        Ok(self.find(kind, id))
    }

    async fn transition(
        &self,
        credential: &Credential,
        kind: EntityKind,
        id: &EntityId,
        action: Action,
        payload: &TransitionPayload,
    ) -> Result<(), CollaboratorError> {
        if self.transition_delay {
            tokio::task::yield_now().await;
        }
        let gate = self.transition_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check(credential)?;

        let mut records = self.records.write().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.kind == kind && &r.id == id)
            .ok_or_else(|| CollaboratorError::NotFound(format!("{} {}", kind, id)))?;

        let status = next_status(kind, &record.status, action).ok_or_else(|| {
            CollaboratorError::Rejected(format!("cannot {} while {}", action, record.status))
        })?;
        record.status = status;
        if let Some(reason) = &payload.reason {
            record.reason = Some(reason.clone());
        }
        if let Some(flag) = action.sets_flag() {
            record.flags.insert(flag.to_string(), true);
        }

        let mut audit = self.audit.lock().unwrap();
        let mut entry = AuditEntry::new(format!("audit-{}", audit.len() + 1), action.to_string())
            .on(kind, id.clone());
        entry.reason = payload.reason.clone();
        audit.push(entry);
        drop(audit);

        self.transitions.lock().unwrap().push(TransitionCall {
            kind,
            id: id.clone(),
            action,
            payload: payload.clone(),
        });
        Ok(())
    }

    async fn remove_entity(
        &self,
        credential: &Credential,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<(), CollaboratorError> {
        self.check(credential)?;
        let mut records = self.records.write().unwrap();
        let before = records.len();
        records.retain(|r| !(r.kind == kind && &r.id == id));
        if records.len() == before {
            return Err(CollaboratorError::NotFound(format!("{} {}", kind, id)));
        }
        self.removed.lock().unwrap().push((kind, id.clone()));
        Ok(())
    }

    async fn dashboard_stats(
        &self,
        credential: &Credential,
    ) -> Result<DashboardStats, CollaboratorError> {
        self.check(credential)?;
        Ok(self.dashboard.clone())
    }

    async fn audit_log(
        &self,
        credential: &Credential,
        query: &AuditQuery,
    ) -> Result<Vec<AuditEntry>, CollaboratorError> {
        self.check(credential)?;
        let limit = query.limit.map_or(usize::MAX, |l| l as usize);
        Ok(self
            .audit
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|e| e.concerns(query.entity_type, query.entity_id.as_ref()))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn subscribe(
        &self,
        credential: &Credential,
        kind: EntityKind,
    ) -> Result<Subscription, CollaboratorError> {
        self.check(credential)?;
        let (tx, subscription) = Subscription::channel(kind, 16);
        self.subscribers.lock().unwrap().push((kind, tx));
        Ok(subscription)
    }
}
