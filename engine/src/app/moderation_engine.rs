//! Moderation workflow engine
//!
//! One engine per list view (restaurants, riders, orders, users). It keeps
//! the fetched collection in memory, answers filter/search/stats queries
//! from it, and runs operator transitions against the backend, reconciling
//! the affected record afterwards so the list never shows a stale status.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use futures::StreamExt;

use super::filter::{filter_entities, StatusFilter, ViewQuery};
use super::in_flight::{InFlightGuard, InFlightRegistry};
use super::load_sequencer::{LoadSequencer, ViewEpoch};
use super::stats::{count_by_status, partition_by_flag, sum_metric, FlagPartition, StatusCounts};
use crate::domain::entities::{
    AccountStatus, Action, AuditEntry, Credential, Entity, EntityId, EntityKind, Lifecycle,
    OrderStatus, TransitionPayload, VERIFIED_FLAG,
};
use crate::domain::ports::{
    AuditQuery, ChangeEvent, Collaborator, DashboardStats, ListParams, Subscription,
};
use crate::error::ModerationError;

/// What happened to a list load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Result replaced the local collection
    Applied { count: usize },
    /// A newer load was issued, or the view was abandoned; result discarded
    Superseded,
}

/// Engine for one entity kind, generic over its status lifecycle
pub struct ModerationEngine<S, C>
where
    S: Lifecycle,
    C: Collaborator,
{
    kind: EntityKind,
    collaborator: Arc<C>,
    credential: RwLock<Credential>,
    entities: RwLock<Vec<Entity<S>>>,
    filter: RwLock<StatusFilter<S>>,
    in_flight: InFlightRegistry,
    loads: LoadSequencer,
}

impl<S, C> ModerationEngine<S, C>
where
    S: Lifecycle,
    C: Collaborator,
{
    pub fn new(
        kind: EntityKind,
        collaborator: Arc<C>,
        credential: Credential,
    ) -> Result<Self, ModerationError> {
        if !S::applies_to(kind) {
            return Err(ModerationError::InvalidInput(format!(
                "{} records use a different status lifecycle",
                kind
            )));
        }
        Ok(Self {
            kind,
            collaborator,
            credential: RwLock::new(credential),
            entities: RwLock::new(Vec::new()),
            filter: RwLock::new(StatusFilter::All),
            in_flight: InFlightRegistry::new(),
            loads: LoadSequencer::new(),
        })
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Swap in a fresh credential (e.g. after re-login)
    pub fn set_credential(&self, credential: Credential) {
        *self
            .credential
            .write()
            .unwrap_or_else(PoisonError::into_inner) = credential;
    }

    /// Status filter of the last applied load
    pub fn current_filter(&self) -> StatusFilter<S> {
        *self.filter.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the whole local collection
    pub fn entities(&self) -> Vec<Entity<S>> {
        self.read_entities().clone()
    }

    pub fn get(&self, id: &EntityId) -> Option<Entity<S>> {
        self.read_entities().iter().find(|e| &e.id == id).cloned()
    }

    /// Whether a transition on `id` is outstanding (disable its buttons)
    pub fn is_busy(&self, id: &EntityId) -> bool {
        self.in_flight.is_in_flight(id)
    }

    // ========================================================================
    // Queries over the local snapshot
    // ========================================================================

    /// Filtered and searched rows in collection order
    pub fn view(&self, query: &ViewQuery<S>) -> Vec<Entity<S>> {
        let entities = self.read_entities();
        filter_entities(
            &entities,
            &query.status,
            &query.search,
            self.kind.search_fields(),
        )
        .into_iter()
        .cloned()
        .collect()
    }

    pub fn stats(&self) -> StatusCounts<S> {
        count_by_status(&self.read_entities())
    }

    pub fn partition(&self, flag: &str) -> FlagPartition {
        partition_by_flag(&self.read_entities(), flag)
    }

    pub fn sum_metric(&self, metric: &str) -> f64 {
        sum_metric(&self.read_entities(), metric)
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Fetch the list for `filter`. A load issued later wins; this one then
    /// reports `Superseded` and leaves the collection alone.
    pub async fn load(&self, filter: StatusFilter<S>) -> Result<LoadOutcome, ModerationError> {
        let credential = self.authorized()?;
        let ticket = self.loads.begin();
        let params = ListParams {
            status: filter.as_param(),
            search: None,
        };

        let result = self
            .collaborator
            .list_entities(&credential, self.kind, &params)
            .await;

        let mut entities = self.write_entities();
        if !self.loads.is_current(ticket) {
            tracing::debug!(kind = %self.kind, filter = %filter, "Discarding superseded load");
            return Ok(LoadOutcome::Superseded);
        }

        let snapshots = result.map_err(|e| {
            tracing::warn!(kind = %self.kind, error = %e, "Failed to load list");
            ModerationError::from(e)
        })?;

        let loaded: Vec<Entity<S>> = snapshots
            .into_iter()
            .filter_map(|snapshot| {
                let id = snapshot.id.clone();
                Entity::from_snapshot(snapshot)
                    .map_err(|e| {
                        tracing::warn!(kind = %self.kind, id = %id, error = %e, "Skipping unreadable record");
                    })
                    .ok()
            })
            .collect();

        let count = loaded.len();
        *entities = loaded;
        *self.filter.write().unwrap_or_else(PoisonError::into_inner) = filter;
        tracing::debug!(kind = %self.kind, filter = %filter, count, "Loaded list");

        Ok(LoadOutcome::Applied { count })
    }

    /// Reload with the current filter
    pub async fn reload(&self) -> Result<LoadOutcome, ModerationError> {
        self.load(self.current_filter()).await
    }

    /// Navigating away: results of in-flight requests are ignored from now on
    pub fn abandon(&self) {
        tracing::debug!(kind = %self.kind, "Abandoning view");
        self.loads.abandon();
    }

    // ========================================================================
    // Realtime
    // ========================================================================

    pub async fn subscribe(&self) -> Result<Subscription, ModerationError> {
        let credential = self.authorized()?;
        Ok(self.collaborator.subscribe(&credential, self.kind).await?)
    }

    /// Merge one change event by id: append if new, replace in place if
    /// known, drop on removal. Returns whether the collection changed.
    pub fn apply_change(&self, event: ChangeEvent) -> bool {
        if event.kind() != self.kind {
            return false;
        }

        match event {
            ChangeEvent::Upserted(snapshot) => {
                let id = snapshot.id.clone();
                match Entity::<S>::from_snapshot(snapshot) {
                    Ok(entity) => {
                        self.upsert_local(entity);
                        true
                    }
                    Err(e) => {
                        tracing::warn!(kind = %self.kind, id = %id, error = %e, "Ignoring unreadable change event");
                        false
                    }
                }
            }
            ChangeEvent::Removed { id, .. } => {
                let mut entities = self.write_entities();
                let before = entities.len();
                entities.retain(|e| e.id != id);
                entities.len() != before
            }
        }
    }

    /// Current view generation; pair it with a subscription for `follow`
    pub fn view_epoch(&self) -> ViewEpoch {
        self.loads.epoch()
    }

    /// Drive a subscription into the collection until the feed closes or
    /// the view of `epoch` is abandoned. Returns the number of applied events.
    pub async fn follow(&self, mut subscription: Subscription, epoch: ViewEpoch) -> usize {
        let mut abandoned = self.loads.watch_epoch();
        if !self.loads.is_current_epoch(epoch) {
            tracing::debug!(kind = %self.kind, "View already abandoned, not following");
            subscription.unsubscribe();
            return 0;
        }
        let mut applied = 0;

        loop {
            tokio::select! {
                _ = abandoned.changed() => {
                    tracing::debug!(kind = %self.kind, "View abandoned, leaving change feed");
                    break;
                }
                event = subscription.next() => match event {
                    Some(event) => {
                        if self.apply_change(event) {
                            applied += 1;
                        }
                    }
                    None => {
                        tracing::info!(kind = %self.kind, "Change feed closed");
                        break;
                    }
                },
            }
        }

        subscription.unsubscribe();
        applied
    }

    // ========================================================================
    // Backend passthrough
    // ========================================================================

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ModerationError> {
        let credential = self.authorized()?;
        Ok(self.collaborator.dashboard_stats(&credential).await?)
    }

    /// Read-only audit trail of operator actions, newest first as served
    pub async fn audit_log(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, ModerationError> {
        let credential = self.authorized()?;
        Ok(self.collaborator.audit_log(&credential, query).await?)
    }

    /// Delete a record through the backend, then drop it locally
    pub async fn remove(&self, id: &EntityId) -> Result<(), ModerationError> {
        let credential = self.authorized()?;
        if !self.kind.supports_removal() {
            return Err(ModerationError::InvalidInput(format!(
                "{} records cannot be removed",
                self.kind
            )));
        }
        let _guard = self.claim(id)?;
        let epoch = self.loads.epoch();

        self.collaborator
            .remove_entity(&credential, self.kind, id)
            .await
            .map_err(|e| {
                tracing::warn!(kind = %self.kind, id = %id, error = %e, "Removal failed");
                ModerationError::from(e)
            })?;

        tracing::info!(kind = %self.kind, id = %id, "Removed record");
        if self.loads.is_current_epoch(epoch) {
            self.write_entities().retain(|e| &e.id != id);
        }
        Ok(())
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Run `action` on `id`. `precheck` sees the current record before any
    /// network effect and may veto the call.
    async fn run_transition<F>(
        &self,
        id: &EntityId,
        action: Action,
        payload: TransitionPayload,
        precheck: F,
    ) -> Result<Entity<S>, ModerationError>
    where
        F: FnOnce(&Entity<S>) -> Result<(), ModerationError>,
    {
        let credential = self.authorized()?;
        if !self.kind.supports(action) {
            return Err(ModerationError::InvalidInput(format!(
                "cannot {} a {}",
                action, self.kind
            )));
        }
        let payload = validate_payload(action, payload)?;

        let _guard = self.claim(id)?;
        let current = self.resolve(&credential, id).await?;
        let target = current.status.target(action).ok_or_else(|| {
            ModerationError::TransitionRejected(format!(
                "cannot {} {} {} while it is {}",
                action, self.kind, id, current.status
            ))
        })?;
        precheck(&current)?;

        let epoch = self.loads.epoch();
        self.collaborator
            .transition(&credential, self.kind, id, action, &payload)
            .await
            .map_err(|e| {
                tracing::warn!(kind = %self.kind, id = %id, action = %action, error = %e, "Transition failed");
                ModerationError::from(e)
            })?;

        tracing::info!(
            kind = %self.kind,
            id = %id,
            action = %action,
            from = %current.status,
            to = %target,
            "Transition applied"
        );

        Ok(self
            .reconcile(&credential, current, target, action, &payload, epoch)
            .await)
    }

    fn claim(&self, id: &EntityId) -> Result<InFlightGuard<'_>, ModerationError> {
        self.in_flight.try_acquire(id).ok_or_else(|| {
            ModerationError::TransitionRejected(format!(
                "another change to {} {} is still in progress",
                self.kind, id
            ))
        })
    }

    /// Local record, or the backend's copy when it is not in the list
    async fn resolve(
        &self,
        credential: &Credential,
        id: &EntityId,
    ) -> Result<Entity<S>, ModerationError> {
        if let Some(entity) = self.get(id) {
            return Ok(entity);
        }

        let snapshot = self
            .collaborator
            .get_entity(credential, self.kind, id)
            .await?
            .ok_or_else(|| ModerationError::NotFound(format!("{} {}", self.kind, id)))?;

        Entity::from_snapshot(snapshot).map_err(ModerationError::InvalidInput)
    }

    /// Re-fetch the record after a transition, falling back to patching the
    /// local copy when the backend cannot be read back.
    async fn reconcile(
        &self,
        credential: &Credential,
        current: Entity<S>,
        target: S,
        action: Action,
        payload: &TransitionPayload,
        epoch: ViewEpoch,
    ) -> Entity<S> {
        let refreshed = match self
            .collaborator
            .get_entity(credential, self.kind, &current.id)
            .await
        {
            Ok(Some(snapshot)) => Entity::<S>::from_snapshot(snapshot)
                .map_err(|e| {
                    tracing::warn!(kind = %self.kind, id = %current.id, error = %e, "Refetched record unreadable, patching locally");
                })
                .ok(),
            Ok(None) => {
                tracing::warn!(kind = %self.kind, id = %current.id, "Record vanished after transition, patching locally");
                None
            }
            Err(e) => {
                tracing::warn!(kind = %self.kind, id = %current.id, error = %e, "Refetch failed, patching locally");
                None
            }
        };

        let updated = refreshed.unwrap_or_else(|| {
            let mut patched = current;
            patched.status = target;
            if let Some(reason) = &payload.reason {
                patched.reason = Some(reason.clone());
            }
            if let Some(flag) = action.sets_flag() {
                patched.flags.insert(flag.to_string(), true);
            }
            patched
        });

        if self.loads.is_current_epoch(epoch) {
            self.replace_local(updated.clone());
        } else {
            tracing::debug!(kind = %self.kind, id = %updated.id, "View abandoned, skipping local update");
        }
        updated
    }

    // ========================================================================
    // Local collection helpers (no lock is held across an await)
    // ========================================================================

    fn authorized(&self) -> Result<Credential, ModerationError> {
        let credential = self
            .credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        credential.validate(Utc::now())?;
        Ok(credential)
    }

    fn read_entities(&self) -> RwLockReadGuard<'_, Vec<Entity<S>>> {
        self.entities.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entities(&self) -> RwLockWriteGuard<'_, Vec<Entity<S>>> {
        self.entities.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn upsert_local(&self, entity: Entity<S>) {
        let mut entities = self.write_entities();
        match entities.iter_mut().find(|e| e.id == entity.id) {
            Some(slot) => *slot = entity,
            None => entities.push(entity),
        }
    }

    /// Replace in place; records outside the loaded list stay out of it
    fn replace_local(&self, entity: Entity<S>) {
        let mut entities = self.write_entities();
        if let Some(slot) = entities.iter_mut().find(|e| e.id == entity.id) {
            *slot = entity;
        }
    }
}

/// Client-side preconditions on the payload, checked before any network call
fn validate_payload(
    action: Action,
    payload: TransitionPayload,
) -> Result<TransitionPayload, ModerationError> {
    let reason = payload
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    if action.requires_reason() && reason.is_none() {
        return Err(ModerationError::InvalidInput(format!(
            "a reason is required to {}",
            action
        )));
    }

    Ok(TransitionPayload {
        reason,
        amount: payload.amount,
    })
}

impl<C: Collaborator> ModerationEngine<AccountStatus, C> {
    /// pending → approved
    pub async fn approve(&self, id: &EntityId) -> Result<Entity<AccountStatus>, ModerationError> {
        self.run_transition(id, Action::Approve, TransitionPayload::none(), |_| Ok(()))
            .await
    }

    /// pending → rejected, reason kept for audit
    pub async fn reject(
        &self,
        id: &EntityId,
        reason: &str,
    ) -> Result<Entity<AccountStatus>, ModerationError> {
        self.run_transition(id, Action::Reject, TransitionPayload::reason(reason), |_| Ok(()))
            .await
    }

    /// approved → suspended (restaurants, riders)
    pub async fn suspend(&self, id: &EntityId) -> Result<Entity<AccountStatus>, ModerationError> {
        self.run_transition(id, Action::Suspend, TransitionPayload::none(), |_| Ok(()))
            .await
    }

    /// suspended → approved (restaurants, riders)
    pub async fn reinstate(&self, id: &EntityId) -> Result<Entity<AccountStatus>, ModerationError> {
        self.run_transition(id, Action::Reinstate, TransitionPayload::none(), |_| Ok(()))
            .await
    }

    /// approved → suspended (users)
    pub async fn ban(
        &self,
        id: &EntityId,
        reason: &str,
    ) -> Result<Entity<AccountStatus>, ModerationError> {
        self.run_transition(id, Action::Ban, TransitionPayload::reason(reason), |_| Ok(()))
            .await
    }

    /// suspended → approved (users)
    pub async fn unban(&self, id: &EntityId) -> Result<Entity<AccountStatus>, ModerationError> {
        self.run_transition(id, Action::Unban, TransitionPayload::none(), |_| Ok(()))
            .await
    }

    /// Mark a rider's documents as checked. The status is unchanged.
    pub async fn verify(&self, id: &EntityId) -> Result<Entity<AccountStatus>, ModerationError> {
        let kind = self.kind;
        self.run_transition(id, Action::Verify, TransitionPayload::none(), |rider| {
            if rider.flag(VERIFIED_FLAG) {
                return Err(ModerationError::TransitionRejected(format!(
                    "{} {} is already verified",
                    kind, rider.id
                )));
            }
            Ok(())
        })
        .await
    }
}

impl<C: Collaborator> ModerationEngine<OrderStatus, C> {
    /// Any non-terminal status → cancelled
    pub async fn cancel(
        &self,
        id: &EntityId,
        reason: &str,
    ) -> Result<Entity<OrderStatus>, ModerationError> {
        self.run_transition(id, Action::Cancel, TransitionPayload::reason(reason), |_| Ok(()))
            .await
    }

    /// Refund part or all of a delivered or cancelled order
    pub async fn refund(
        &self,
        id: &EntityId,
        amount: f64,
    ) -> Result<Entity<OrderStatus>, ModerationError> {
        self.run_transition(id, Action::Refund, TransitionPayload::amount(amount), |order| {
            let total = order.total();
            if !amount.is_finite() || amount <= 0.0 || amount > total {
                return Err(ModerationError::InvalidRefundAmount { amount, total });
            }
            Ok(())
        })
        .await
    }
}
