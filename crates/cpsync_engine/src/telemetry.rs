//! Operation telemetry.
//!
//! Every dispatcher call holds an [`OpGuard`] for its whole duration. The
//! guard owns the mutable borrow of the entity, so the dispatcher works on
//! the entity through it, and it emits exactly one log record and one
//! counter increment when dropped, whichever way the call exits.

use crate::op::{Op, OperationRecord};
use cpsync_core::SyncEntity;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

/// How a dispatcher call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The adapter call succeeded.
    Succeeded,
    /// The adapter call failed.
    Failed,
    /// The staleness gate skipped the adapter call.
    Skipped,
    /// A precondition failed before any adapter was called.
    Rejected,
}

impl Outcome {
    const ALL: [Outcome; 4] = [
        Outcome::Succeeded,
        Outcome::Failed,
        Outcome::Skipped,
        Outcome::Rejected,
    ];

    /// Returns the outcome name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Outcome::Succeeded => "succeeded",
            Outcome::Failed => "failed",
            Outcome::Skipped => "skipped",
            Outcome::Rejected => "rejected",
        }
    }

    const fn index(self) -> usize {
        match self {
            Outcome::Succeeded => 0,
            Outcome::Failed => 1,
            Outcome::Skipped => 2,
            Outcome::Rejected => 3,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters of completed dispatcher calls, per operation and outcome.
///
/// All counters are atomic and can be read while calls are in flight.
#[derive(Debug, Default)]
pub struct OperationStats {
    counts: [[AtomicU64; 4]; 3],
}

impl OperationStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, op: Op, outcome: Outcome) {
        self.counts[op.index()][outcome.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the count for one operation and outcome.
    pub fn count(&self, op: Op, outcome: Outcome) -> u64 {
        self.counts[op.index()][outcome.index()].load(Ordering::Relaxed)
    }

    /// Returns the number of completed calls of `op`, whatever the outcome.
    pub fn total(&self, op: Op) -> u64 {
        Outcome::ALL.iter().map(|o| self.count(op, *o)).sum()
    }

    /// Takes a point-in-time copy of all counters.
    pub fn snapshot(&self) -> OperationStatsSnapshot {
        let mut counts = [[0u64; 4]; 3];
        for op in Op::ALL {
            for outcome in Outcome::ALL {
                counts[op.index()][outcome.index()] = self.count(op, outcome);
            }
        }
        OperationStatsSnapshot { counts }
    }
}

/// A copy of [`OperationStats`] at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationStatsSnapshot {
    counts: [[u64; 4]; 3],
}

impl OperationStatsSnapshot {
    /// Returns the count for one operation and outcome.
    pub fn count(&self, op: Op, outcome: Outcome) -> u64 {
        self.counts[op.index()][outcome.index()]
    }

    /// Returns the number of completed calls of `op`.
    pub fn total(&self, op: Op) -> u64 {
        self.counts[op.index()].iter().sum()
    }

    /// Returns the number of calls that reached an adapter.
    pub fn remote_calls(&self) -> u64 {
        Op::ALL
            .iter()
            .map(|op| {
                self.count(*op, Outcome::Succeeded) + self.count(*op, Outcome::Failed)
            })
            .sum()
    }
}

/// Scoped telemetry for one dispatcher call.
pub(crate) struct OpGuard<'a, E: SyncEntity> {
    record: OperationRecord,
    entity: &'a mut E,
    stats: &'a OperationStats,
    outcome: Outcome,
}

impl<'a, E: SyncEntity> OpGuard<'a, E> {
    /// Starts timing `op` on `entity`.
    ///
    /// The outcome defaults to [`Outcome::Failed`] so that an unwinding
    /// adapter is still reported.
    pub(crate) fn start(op: Op, entity: &'a mut E, stats: &'a OperationStats) -> Self {
        Self {
            record: OperationRecord::start(op, &*entity),
            entity,
            stats,
            outcome: Outcome::Failed,
        }
    }

    pub(crate) fn set_outcome(&mut self, outcome: Outcome) {
        self.outcome = outcome;
    }
}

impl<E: SyncEntity> Deref for OpGuard<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        self.entity
    }
}

impl<E: SyncEntity> DerefMut for OpGuard<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        self.entity
    }
}

impl<E: SyncEntity> Drop for OpGuard<'_, E> {
    fn drop(&mut self) {
        let duration = self.record.started_at.elapsed();
        let record = &self.record;
        // Read after the call so a freshly created identity shows up.
        let remote_id = self.entity.remote_id().unwrap_or_default();

        match self.outcome {
            Outcome::Succeeded | Outcome::Failed => tracing::info!(
                op = %record.op,
                kind = %record.kind,
                key = %record.key,
                remote_id,
                outcome = %self.outcome,
                ?duration,
                "operation in remote API complete"
            ),
            Outcome::Skipped => tracing::debug!(
                op = %record.op,
                kind = %record.kind,
                key = %record.key,
                remote_id,
                ?duration,
                "operation skipped, entity in sync"
            ),
            Outcome::Rejected => tracing::warn!(
                op = %record.op,
                kind = %record.kind,
                key = %record.key,
                remote_id,
                ?duration,
                "operation rejected before reaching the remote API"
            ),
        }

        self.stats.record(record.op, self.outcome);
    }
}
