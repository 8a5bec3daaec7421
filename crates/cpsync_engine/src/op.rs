//! Operation kinds and per-call operation records.

use cpsync_core::{EntityKind, ObjectKey, SyncEntity};
use std::fmt;
use std::time::Instant;

/// Kind of remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Create the entity remotely.
    Create,
    /// Update the remote counterpart.
    Update,
    /// Delete the remote counterpart.
    Delete,
}

impl Op {
    /// All operation kinds.
    pub const ALL: [Op; 3] = [Op::Create, Op::Update, Op::Delete];

    /// Returns the lowercase operation name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Op::Create => "create",
            Op::Update => "update",
            Op::Delete => "delete",
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Op::Create => 0,
            Op::Update => 1,
            Op::Delete => 2,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What is known about an operation when it starts.
///
/// Built once per dispatch call and never shared outside it.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    /// Operation kind.
    pub op: Op,
    /// Entity kind.
    pub kind: EntityKind,
    /// Entity key.
    pub key: ObjectKey,
    /// Start of the call.
    pub started_at: Instant,
}

impl OperationRecord {
    /// Captures the record for `entity` now.
    #[must_use]
    pub fn start(op: Op, entity: &dyn SyncEntity) -> Self {
        Self {
            op,
            kind: entity.kind(),
            key: entity.key(),
            started_at: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpsync_core::{ControlPlaneSpec, Entity, ObjectMeta};

    #[test]
    fn op_names() {
        assert_eq!(Op::Create.to_string(), "create");
        assert_eq!(Op::Update.as_str(), "update");
        assert_eq!(format!("{}", Op::Delete), "delete");
    }

    #[test]
    fn record_captures_entity() {
        let cp = Entity::new(
            ObjectMeta::new("", "cp"),
            ControlPlaneSpec {
                name: "cp".into(),
                ..Default::default()
            },
        )
        .with_remote_id("id-1");

        let record = OperationRecord::start(Op::Update, &cp);
        assert_eq!(record.op, Op::Update);
        assert_eq!(record.kind, EntityKind::ControlPlane);
        assert_eq!(record.key.to_string(), "cp");
    }
}
