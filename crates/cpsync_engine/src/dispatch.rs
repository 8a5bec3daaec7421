//! Operation dispatcher.

use crate::adapter::{AdapterSet, Dispatchable, RemoteAdapter};
use crate::config::SyncConfig;
use crate::context::OpContext;
use crate::error::{SyncError, SyncResult};
use crate::gate::{check_freshness, Freshness};
use crate::op::Op;
use crate::telemetry::{OpGuard, OperationStats, OperationStatsSnapshot, Outcome};
use cpsync_core::{AnyEntity, Entity, SyncEntity};
use std::time::Duration;
use tracing::{debug, error};

/// Result of an update call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The entity was in sync; no remote call was made.
    Fresh {
        /// Remaining part of the sync period. The caller should hand the
        /// entity back no earlier than this.
        requeue_after: Duration,
    },
    /// The adapter updated the remote counterpart.
    Updated,
}

impl UpdateOutcome {
    /// Returns the requeue hint; zero after a dispatched update.
    pub fn requeue_after(&self) -> Duration {
        match self {
            UpdateOutcome::Fresh { requeue_after } => *requeue_after,
            UpdateOutcome::Updated => Duration::ZERO,
        }
    }

    /// Returns true if the adapter was called.
    pub fn was_dispatched(&self) -> bool {
        matches!(self, UpdateOutcome::Updated)
    }
}

/// Routes create/update/delete for typed entities to their adapters.
///
/// The dispatcher keeps no per-entity state. Calls for different entities
/// may run concurrently; calls for the same entity must be serialized by
/// the caller, which `&mut` access already enforces within one process.
#[derive(Debug)]
pub struct Dispatcher {
    adapters: AdapterSet,
    config: SyncConfig,
    stats: OperationStats,
}

impl Dispatcher {
    /// Creates a dispatcher.
    pub fn new(adapters: AdapterSet, config: SyncConfig) -> Self {
        Self {
            adapters,
            config,
            stats: OperationStats::new(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns a copy of the operation counters.
    pub fn stats(&self) -> OperationStatsSnapshot {
        self.stats.snapshot()
    }

    /// Creates the entity remotely.
    ///
    /// The adapter records the new remote identity on success. An identity
    /// that is already set is passed through untouched; whether that is an
    /// error is up to the adapter.
    pub fn create<S: Dispatchable>(
        &self,
        ctx: &OpContext,
        entity: &mut Entity<S>,
    ) -> SyncResult<()> {
        let mut guard = OpGuard::start(Op::Create, entity, &self.stats);
        let result = self.dispatch_create(ctx, &mut guard);
        guard.set_outcome(outcome_of(&result));
        result
    }

    /// Updates the remote counterpart unless the staleness gate reports the
    /// entity fresh for `sync_period`.
    pub fn update<S: Dispatchable>(
        &self,
        ctx: &OpContext,
        entity: &mut Entity<S>,
        sync_period: Duration,
    ) -> SyncResult<UpdateOutcome> {
        let mut guard = OpGuard::start(Op::Update, entity, &self.stats);
        let result = self.dispatch_update(ctx, &mut guard, sync_period);
        guard.set_outcome(match &result {
            Ok(UpdateOutcome::Fresh { .. }) => Outcome::Skipped,
            other => outcome_of(other),
        });
        result
    }

    /// [`Dispatcher::update`] with the configured sync period.
    pub fn update_with_default<S: Dispatchable>(
        &self,
        ctx: &OpContext,
        entity: &mut Entity<S>,
    ) -> SyncResult<UpdateOutcome> {
        self.update(ctx, entity, self.config.sync_period)
    }

    /// Deletes the remote counterpart.
    ///
    /// No existence check is made; the adapter treats an absent remote
    /// counterpart as success.
    pub fn delete<S: Dispatchable>(
        &self,
        ctx: &OpContext,
        entity: &mut Entity<S>,
    ) -> SyncResult<()> {
        let mut guard = OpGuard::start(Op::Delete, entity, &self.stats);
        let result = self.dispatch_delete(ctx, &mut guard);
        guard.set_outcome(outcome_of(&result));
        result
    }

    /// [`Dispatcher::create`] for an entity of any kind.
    pub fn create_any(&self, ctx: &OpContext, entity: &mut AnyEntity) -> SyncResult<()> {
        match entity {
            AnyEntity::ControlPlane(e) => self.create(ctx, e),
            AnyEntity::Service(e) => self.create(ctx, e),
            AnyEntity::Route(e) => self.create(ctx, e),
            AnyEntity::Consumer(e) => self.create(ctx, e),
            AnyEntity::ConsumerGroup(e) => self.create(ctx, e),
        }
    }

    /// [`Dispatcher::update`] for an entity of any kind.
    pub fn update_any(
        &self,
        ctx: &OpContext,
        entity: &mut AnyEntity,
        sync_period: Duration,
    ) -> SyncResult<UpdateOutcome> {
        match entity {
            AnyEntity::ControlPlane(e) => self.update(ctx, e, sync_period),
            AnyEntity::Service(e) => self.update(ctx, e, sync_period),
            AnyEntity::Route(e) => self.update(ctx, e, sync_period),
            AnyEntity::Consumer(e) => self.update(ctx, e, sync_period),
            AnyEntity::ConsumerGroup(e) => self.update(ctx, e, sync_period),
        }
    }

    /// [`Dispatcher::delete`] for an entity of any kind.
    pub fn delete_any(&self, ctx: &OpContext, entity: &mut AnyEntity) -> SyncResult<()> {
        match entity {
            AnyEntity::ControlPlane(e) => self.delete(ctx, e),
            AnyEntity::Service(e) => self.delete(ctx, e),
            AnyEntity::Route(e) => self.delete(ctx, e),
            AnyEntity::Consumer(e) => self.delete(ctx, e),
            AnyEntity::ConsumerGroup(e) => self.delete(ctx, e),
        }
    }

    fn dispatch_create<S: Dispatchable>(
        &self,
        ctx: &OpContext,
        entity: &mut Entity<S>,
    ) -> SyncResult<()> {
        let adapter = self.adapter_for::<S>()?;
        if let Some(id) = entity.remote_id() {
            debug!(
                kind = %S::KIND,
                key = %entity.key(),
                remote_id = id,
                "creating entity that already has a remote ID"
            );
        }
        if let Err(e) = adapter.create(ctx, entity) {
            return Err(SyncError::remote_failed(Op::Create, entity, e));
        }
        Ok(())
    }

    fn dispatch_update<S: Dispatchable>(
        &self,
        ctx: &OpContext,
        entity: &mut Entity<S>,
        sync_period: Duration,
    ) -> SyncResult<UpdateOutcome> {
        let adapter = self.adapter_for::<S>()?;
        require_remote_id(Op::Update, entity)?;

        let now = self.config.clock.now();
        match check_freshness(entity.conditions(), entity.generation(), now, sync_period) {
            Freshness::Fresh {
                elapsed,
                requeue_after,
            } => {
                debug!(
                    kind = %S::KIND,
                    key = %entity.key(),
                    ?elapsed,
                    ?requeue_after,
                    "no need for update, requeueing after configured sync period"
                );
                return Ok(UpdateOutcome::Fresh { requeue_after });
            }
            Freshness::Stale(reason) => {
                debug!(kind = %S::KIND, key = %entity.key(), %reason, "entity is stale");
            }
        }

        if let Err(e) = adapter.update(ctx, entity) {
            return Err(SyncError::remote_failed(Op::Update, entity, e));
        }
        Ok(UpdateOutcome::Updated)
    }

    fn dispatch_delete<S: Dispatchable>(
        &self,
        ctx: &OpContext,
        entity: &mut Entity<S>,
    ) -> SyncResult<()> {
        let adapter = self.adapter_for::<S>()?;
        require_remote_id(Op::Delete, entity)?;
        if let Err(e) = adapter.delete(ctx, entity) {
            return Err(SyncError::remote_failed(Op::Delete, entity, e));
        }
        Ok(())
    }

    fn adapter_for<S: Dispatchable>(&self) -> SyncResult<&dyn RemoteAdapter<S>> {
        S::adapter(&self.adapters).ok_or_else(|| {
            error!(kind = %S::KIND, "no remote adapter bound for entity kind");
            SyncError::UnsupportedKind { kind: S::KIND }
        })
    }
}

fn require_remote_id(op: Op, entity: &dyn SyncEntity) -> SyncResult<()> {
    match entity.remote_id() {
        Some(_) => Ok(()),
        None => Err(SyncError::missing_remote_id(op, entity)),
    }
}

fn outcome_of<T>(result: &SyncResult<T>) -> Outcome {
    match result {
        Ok(_) => Outcome::Succeeded,
        Err(SyncError::RemoteOperationFailed { .. }) => Outcome::Failed,
        Err(_) => Outcome::Rejected,
    }
}
