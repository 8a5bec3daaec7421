//! Recording operation outcomes in the `Programmed` condition.
//!
//! The dispatcher only reads conditions. Callers use these helpers after a
//! create or a dispatched update to write the condition the staleness gate
//! consults on the next call.

use crate::error::SyncError;
use cpsync_core::{condition_types, reasons, Condition, ConditionStatus, SyncEntity};
use std::time::SystemTime;

/// Marks the entity as programmed at its current generation.
///
/// Returns true if the condition changed.
pub fn mark_programmed(entity: &mut dyn SyncEntity, now: SystemTime) -> bool {
    let generation = entity.generation();
    entity.conditions_mut().set(
        Condition::new(condition_types::PROGRAMMED, ConditionStatus::True, now)
            .with_reason(reasons::PROGRAMMED)
            .with_observed_generation(generation),
    )
}

/// Marks the entity as failed to program, carrying the error message.
///
/// Returns true if the condition changed.
pub fn mark_failed(entity: &mut dyn SyncEntity, error: &SyncError, now: SystemTime) -> bool {
    let generation = entity.generation();
    entity.conditions_mut().set(
        Condition::new(condition_types::PROGRAMMED, ConditionStatus::False, now)
            .with_reason(reasons::REMOTE_API_OP_FAILED)
            .with_message(error.to_string())
            .with_observed_generation(generation),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdapterError;
    use crate::gate::check_freshness;
    use crate::op::Op;
    use cpsync_core::{Entity, ObjectMeta, RouteSpec};
    use std::time::Duration;

    #[test]
    fn programmed_condition_makes_entity_fresh() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(500);
        let mut route = Entity::new(ObjectMeta::new("default", "r1"), RouteSpec::default());
        assert!(mark_programmed(&mut route, now));

        let freshness = check_freshness(
            route.conditions(),
            route.generation(),
            now,
            Duration::from_secs(60),
        );
        assert!(freshness.is_fresh());
    }

    #[test]
    fn failure_condition_carries_message() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(500);
        let mut route = Entity::new(ObjectMeta::new("default", "r1"), RouteSpec::default())
            .with_remote_id("abc");
        mark_programmed(&mut route, now);

        let err =
            SyncError::remote_failed(Op::Update, &route, AdapterError::api(502, "bad gateway"));
        let later = now + Duration::from_secs(5);
        assert!(mark_failed(&mut route, &err, later));

        let cond = route.conditions().get(condition_types::PROGRAMMED).unwrap();
        assert_eq!(cond.status, ConditionStatus::False);
        assert_eq!(cond.reason, reasons::REMOTE_API_OP_FAILED);
        assert!(cond.message.contains("abc"));
        assert_eq!(cond.last_transition_time, later);
    }
}
