//! Apply command implementation.

use crate::state::StateFile;
use cpsync_core::AnyEntity;
use cpsync_engine::{
    mark_failed, mark_programmed, AdapterSet, Dispatcher, MemoryRemote, OpContext, SyncConfig,
    SyncResult, UpdateOutcome,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Counts from one apply pass.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    /// Entities created remotely.
    pub created: usize,
    /// Entities updated remotely.
    pub updated: usize,
    /// Entities skipped because they were in sync.
    pub in_sync: usize,
    /// Entities removed from the state file.
    pub deleted: usize,
    /// Entities whose operation failed.
    pub failed: usize,
    /// Shortest requeue hint among in-sync entities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_sync_in: Option<Duration>,
}

enum Action {
    Created,
    Updated,
    InSync(Duration),
    Deleted,
}

/// Runs the apply command.
pub fn run(path: &Path, sync_period: Option<Duration>) -> Result<(), Box<dyn std::error::Error>> {
    let mut state = StateFile::load(path)?;
    let remote = Arc::new(MemoryRemote::from_snapshot(std::mem::take(&mut state.remote)));

    let mut config = SyncConfig::new();
    if let Some(period) = sync_period {
        config = config.with_sync_period(period);
    }
    let dispatcher = Dispatcher::new(AdapterSet::uniform(remote.clone()), config);

    let summary = apply(&dispatcher, &OpContext::new(), &mut state.entities);
    state.remote = remote.snapshot();
    state.save(path)?;

    print_summary(&summary);
    if summary.failed > 0 {
        return Err(format!("{} entities failed to sync", summary.failed).into());
    }
    Ok(())
}

/// Reconciles every entity once and records the outcome in its conditions.
///
/// Entities marked for deletion leave `entities` once nothing is left
/// remotely. Failed entities stay, carrying the error in `Programmed`.
pub fn apply(
    dispatcher: &Dispatcher,
    ctx: &OpContext,
    entities: &mut Vec<AnyEntity>,
) -> ApplySummary {
    let mut summary = ApplySummary::default();
    let period = dispatcher.config().sync_period;

    entities.retain_mut(|entity| {
        let result = reconcile(dispatcher, ctx, entity, period);
        let now = dispatcher.config().clock.now();
        match result {
            Ok(Action::Created) => {
                summary.created += 1;
                mark_programmed(entity.as_sync_entity_mut(), now);
                true
            }
            Ok(Action::Updated) => {
                summary.updated += 1;
                mark_programmed(entity.as_sync_entity_mut(), now);
                true
            }
            Ok(Action::InSync(after)) => {
                summary.in_sync += 1;
                summary.next_sync_in = Some(summary.next_sync_in.map_or(after, |d| d.min(after)));
                true
            }
            Ok(Action::Deleted) => {
                summary.deleted += 1;
                false
            }
            Err(err) => {
                warn!(error = %err, retryable = err.is_retryable(), "entity failed to sync");
                summary.failed += 1;
                mark_failed(entity.as_sync_entity_mut(), &err, now);
                true
            }
        }
    });

    info!(
        created = summary.created,
        updated = summary.updated,
        in_sync = summary.in_sync,
        deleted = summary.deleted,
        failed = summary.failed,
        "apply finished"
    );
    summary
}

fn reconcile(
    dispatcher: &Dispatcher,
    ctx: &OpContext,
    entity: &mut AnyEntity,
    period: Duration,
) -> SyncResult<Action> {
    let has_remote_id = entity.as_sync_entity().remote_id().is_some();

    if entity.is_being_deleted() {
        if has_remote_id {
            dispatcher.delete_any(ctx, entity)?;
        } else {
            let e = entity.as_sync_entity();
            debug!(kind = %e.kind(), key = %e.key(), "dropping entity never created remotely");
        }
        return Ok(Action::Deleted);
    }

    if !has_remote_id {
        dispatcher.create_any(ctx, entity)?;
        return Ok(Action::Created);
    }

    Ok(match dispatcher.update_any(ctx, entity, period)? {
        UpdateOutcome::Fresh { requeue_after } => Action::InSync(requeue_after),
        UpdateOutcome::Updated => Action::Updated,
    })
}

fn print_summary(summary: &ApplySummary) {
    println!("cpsync apply");
    println!("============");
    println!("  Created:  {}", summary.created);
    println!("  Updated:  {}", summary.updated);
    println!("  In sync:  {}", summary.in_sync);
    println!("  Deleted:  {}", summary.deleted);
    println!("  Failed:   {}", summary.failed);
    if let Some(after) = summary.next_sync_in {
        println!();
        println!("Next sync due in {}s", after.as_secs());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpsync_core::{
        condition_types, reasons, ConditionStatus, ControlPlaneSpec, Entity, ObjectMeta,
        ServiceSpec,
    };
    use cpsync_engine::{AdapterError, Clock, ManualClock, Op};
    use std::time::SystemTime;

    fn entities() -> Vec<AnyEntity> {
        vec![
            Entity::new(
                ObjectMeta::new("", "prod"),
                ControlPlaneSpec {
                    name: "prod".into(),
                    ..Default::default()
                },
            )
            .into(),
            Entity::new(
                ObjectMeta::new("default", "billing"),
                ServiceSpec {
                    control_plane_ref: "prod".into(),
                    host: "billing.internal".into(),
                    ..Default::default()
                },
            )
            .into(),
        ]
    }

    fn dispatcher(remote: &Arc<MemoryRemote>, clock: &Arc<ManualClock>) -> Dispatcher {
        Dispatcher::new(
            AdapterSet::uniform(remote.clone()),
            SyncConfig::new().with_clock(clock.clone()),
        )
    }

    #[test]
    fn creates_then_skips_until_period_expires() {
        let remote = Arc::new(MemoryRemote::new());
        let clock = Arc::new(ManualClock::default());
        let dispatcher = dispatcher(&remote, &clock);
        let ctx = OpContext::new();
        let mut entities = entities();

        let summary = apply(&dispatcher, &ctx, &mut entities);
        assert_eq!(summary.created, 2);
        assert_eq!(remote.len(), 2);
        for entity in &entities {
            let e = entity.as_sync_entity();
            assert!(e.remote_id().is_some());
            assert!(e.conditions().is_true(condition_types::PROGRAMMED));
        }

        clock.advance(Duration::from_secs(15));
        let summary = apply(&dispatcher, &ctx, &mut entities);
        assert_eq!(summary.in_sync, 2);
        assert_eq!(summary.next_sync_in, Some(Duration::from_secs(45)));
        assert_eq!(remote.calls(Op::Update), 0);

        clock.advance(Duration::from_secs(46));
        let summary = apply(&dispatcher, &ctx, &mut entities);
        assert_eq!(summary.updated, 2);
        assert_eq!(remote.calls(Op::Update), 2);
    }

    #[test]
    fn deleted_entities_leave_the_state() {
        let remote = Arc::new(MemoryRemote::new());
        let clock = Arc::new(ManualClock::default());
        let dispatcher = dispatcher(&remote, &clock);
        let ctx = OpContext::new();
        let mut entities = entities();
        apply(&dispatcher, &ctx, &mut entities);

        for entity in &mut entities {
            if let AnyEntity::Service(svc) = entity {
                svc.metadata.deletion_timestamp = Some(SystemTime::UNIX_EPOCH);
            }
        }
        let mut never_created =
            Entity::new(ObjectMeta::new("default", "draft"), ServiceSpec::default());
        never_created.metadata.deletion_timestamp = Some(SystemTime::UNIX_EPOCH);
        entities.push(never_created.into());

        let summary = apply(&dispatcher, &ctx, &mut entities);
        assert_eq!(summary.deleted, 2);
        assert_eq!(entities.len(), 1);
        assert_eq!(remote.len(), 1);
        assert_eq!(remote.calls(Op::Delete), 1);
    }

    #[test]
    fn failures_are_recorded_on_the_entity() {
        let remote = Arc::new(MemoryRemote::new());
        let clock = Arc::new(ManualClock::default());
        let dispatcher = dispatcher(&remote, &clock);
        remote.fail_on(Op::Create, AdapterError::api(503, "unavailable"));

        let mut entities = entities();
        let summary = apply(&dispatcher, &OpContext::new(), &mut entities);
        assert_eq!(summary.failed, 2);
        assert_eq!(entities.len(), 2);

        let e = entities[1].as_sync_entity();
        assert!(e.remote_id().is_none());
        let cond = e.conditions().get(condition_types::PROGRAMMED).unwrap();
        assert_eq!(cond.status, ConditionStatus::False);
        assert_eq!(cond.reason, reasons::REMOTE_API_OP_FAILED);
        assert!(cond.message.contains("default/billing"));
        assert_eq!(cond.last_transition_time, clock.now());
    }

    #[test]
    fn run_persists_remote_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        StateFile {
            entities: entities(),
            ..Default::default()
        }
        .save(&path)
        .unwrap();

        run(&path, Some(Duration::from_secs(120))).unwrap();

        let state = StateFile::load(&path).unwrap();
        assert_eq!(state.remote.entities.len(), 2);
        for entity in &state.entities {
            let id = entity.as_sync_entity().remote_id().unwrap();
            let record = &state.remote.entities[id];
            assert_eq!(record.key, entity.as_sync_entity().key());
        }

        // A second run finds everything in sync and creates nothing new.
        run(&path, None).unwrap();
        assert_eq!(StateFile::load(&path).unwrap().remote, state.remote);
    }
}
