//! Staleness gate.
//!
//! The `Programmed` condition doubles as a cache entry: while it reports a
//! successful programming of the current generation and is younger than the
//! sync period, an update would only repeat what the remote side already
//! has. The gate never waits or schedules anything itself; the remaining
//! window is handed back to the caller as a requeue hint.

use cpsync_core::{condition_types, reasons, ConditionStatus, Conditions, Generation};
use std::fmt;
use std::time::{Duration, SystemTime};

/// Result of consulting the staleness gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The remote state is known-good; skip the update.
    Fresh {
        /// Time since the `Programmed` condition last transitioned.
        elapsed: Duration,
        /// Remaining part of the sync period.
        requeue_after: Duration,
    },
    /// The update must be dispatched.
    Stale(StaleReason),
}

impl Freshness {
    /// Returns true for [`Freshness::Fresh`].
    pub fn is_fresh(&self) -> bool {
        matches!(self, Freshness::Fresh { .. })
    }
}

/// Why an entity was considered stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// No `Programmed` condition.
    NotProgrammed,
    /// `Programmed` is not `True`.
    NotTrue(ConditionStatus),
    /// `Programmed` is `True` but was set with another reason.
    ReasonMismatch,
    /// The condition was computed for another generation.
    GenerationMismatch {
        /// Generation recorded in the condition.
        observed: Generation,
        /// Current entity generation.
        current: Generation,
    },
    /// The sync period has passed.
    Expired {
        /// How long ago the sync period ran out.
        overdue: Duration,
    },
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::NotProgrammed => f.write_str("no Programmed condition"),
            StaleReason::NotTrue(status) => write!(f, "Programmed is {status}"),
            StaleReason::ReasonMismatch => f.write_str("Programmed reason mismatch"),
            StaleReason::GenerationMismatch { observed, current } => {
                write!(f, "observed {observed}, current {current}")
            }
            StaleReason::Expired { overdue } => write!(f, "sync period expired {overdue:?} ago"),
        }
    }
}

/// Decides whether an update can be skipped.
///
/// Fresh only if the `Programmed` condition is `True`, carries the
/// `Programmed` reason, matches `generation`, and transitioned no more than
/// `sync_period` before `now`. A transition time in the future counts as
/// zero elapsed time.
pub fn check_freshness(
    conditions: &Conditions,
    generation: Generation,
    now: SystemTime,
    sync_period: Duration,
) -> Freshness {
    let Some(cond) = conditions.get(condition_types::PROGRAMMED) else {
        return Freshness::Stale(StaleReason::NotProgrammed);
    };
    if cond.status != ConditionStatus::True {
        return Freshness::Stale(StaleReason::NotTrue(cond.status));
    }
    if cond.reason != reasons::PROGRAMMED {
        return Freshness::Stale(StaleReason::ReasonMismatch);
    }
    if cond.observed_generation != generation {
        return Freshness::Stale(StaleReason::GenerationMismatch {
            observed: cond.observed_generation,
            current: generation,
        });
    }

    let elapsed = now
        .duration_since(cond.last_transition_time)
        .unwrap_or(Duration::ZERO);
    if elapsed > sync_period {
        return Freshness::Stale(StaleReason::Expired {
            overdue: elapsed - sync_period,
        });
    }

    Freshness::Fresh {
        elapsed,
        requeue_after: sync_period - elapsed,
    }
}
