//! In-memory remote control plane.

use crate::adapter::RemoteAdapter;
use crate::context::OpContext;
use crate::error::{AdapterError, AdapterResult};
use crate::op::Op;
use cpsync_core::{Entity, EntityKind, EntitySpec, ObjectKey, SyncEntity};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// An entity as stored by the remote side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    /// Entity kind.
    pub kind: EntityKind,
    /// Local key the entity was created from.
    pub key: ObjectKey,
    /// Last spec pushed for the entity.
    pub payload: serde_json::Value,
    /// Incremented on every update.
    pub version: u64,
}

/// Serializable contents of a [`MemoryRemote`], keyed by remote identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteSnapshot {
    /// Stored entities.
    #[serde(default)]
    pub entities: BTreeMap<String, RemoteRecord>,
}

/// A remote control plane kept in memory.
///
/// Implements [`RemoteAdapter`] for every entity kind. Identities are random
/// UUIDs, creating a second entity with the same kind and key is a
/// conflict, and deleting an absent entity succeeds.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    entities: RwLock<BTreeMap<String, RemoteRecord>>,
    failures: Mutex<HashMap<Op, AdapterError>>,
    calls: [AtomicU64; 3],
    seen_ids: Mutex<Vec<(Op, String)>>,
}

impl MemoryRemote {
    /// Creates an empty remote.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a remote holding the entities of `snapshot`.
    pub fn from_snapshot(snapshot: RemoteSnapshot) -> Self {
        Self {
            entities: RwLock::new(snapshot.entities),
            ..Self::default()
        }
    }

    /// Copies the stored entities.
    pub fn snapshot(&self) -> RemoteSnapshot {
        RemoteSnapshot {
            entities: self.entities.read().clone(),
        }
    }

    /// Returns the entity stored under `id`.
    pub fn get(&self, id: &str) -> Option<RemoteRecord> {
        self.entities.read().get(id).cloned()
    }

    /// Returns the number of stored entities.
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }

    /// Removes an entity behind the adapters' back.
    pub fn remove(&self, id: &str) -> Option<RemoteRecord> {
        self.entities.write().remove(id)
    }

    /// Makes every subsequent `op` fail with `error` until cleared.
    pub fn fail_on(&self, op: Op, error: AdapterError) {
        self.failures.lock().insert(op, error);
    }

    /// Clears injected failures.
    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    /// Returns how many times `op` was invoked, including failed calls.
    pub fn calls(&self, op: Op) -> u64 {
        self.calls[op.index()].load(Ordering::SeqCst)
    }

    /// Returns the remote identities `op` was invoked with, in call order.
    pub fn seen_ids(&self, op: Op) -> Vec<String> {
        self.seen_ids
            .lock()
            .iter()
            .filter(|(seen, _)| *seen == op)
            .map(|(_, id)| id.clone())
            .collect()
    }

    fn begin(&self, op: Op, ctx: &OpContext, entity: &dyn SyncEntity) -> AdapterResult<()> {
        self.calls[op.index()].fetch_add(1, Ordering::SeqCst);
        if let Some(id) = entity.remote_id() {
            self.seen_ids.lock().push((op, id.to_owned()));
        }
        ctx.check()?;
        match self.failures.lock().get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn remote_id_of(entity: &dyn SyncEntity) -> AdapterResult<String> {
    entity
        .remote_id()
        .map(str::to_owned)
        .ok_or_else(|| {
            AdapterError::Invalid(format!("{} {} has no remote ID", entity.kind(), entity.key()))
        })
}

fn payload_of<S: EntitySpec>(entity: &Entity<S>) -> AdapterResult<serde_json::Value> {
    serde_json::to_value(&entity.spec).map_err(|e| AdapterError::Invalid(e.to_string()))
}

impl<S: EntitySpec> RemoteAdapter<S> for MemoryRemote {
    fn create(&self, ctx: &OpContext, entity: &mut Entity<S>) -> AdapterResult<()> {
        self.begin(Op::Create, ctx, entity)?;
        let payload = payload_of(entity)?;
        let key = entity.key();

        let mut entities = self.entities.write();
        if let Some((id, _)) = entities
            .iter()
            .find(|(_, rec)| rec.kind == S::KIND && rec.key == key)
        {
            return Err(AdapterError::Conflict(format!(
                "{} {key} already exists as {id}",
                S::KIND
            )));
        }

        let id = Uuid::new_v4().to_string();
        entities.insert(
            id.clone(),
            RemoteRecord {
                kind: S::KIND,
                key,
                payload,
                version: 1,
            },
        );
        entity.set_remote_id(id);
        Ok(())
    }

    fn update(&self, ctx: &OpContext, entity: &mut Entity<S>) -> AdapterResult<()> {
        self.begin(Op::Update, ctx, entity)?;
        let id = remote_id_of(entity)?;
        let payload = payload_of(entity)?;

        let mut entities = self.entities.write();
        let record = entities
            .get_mut(&id)
            .ok_or_else(|| AdapterError::NotFound(id.clone()))?;
        record.payload = payload;
        record.version += 1;
        Ok(())
    }

    fn delete(&self, ctx: &OpContext, entity: &mut Entity<S>) -> AdapterResult<()> {
        self.begin(Op::Delete, ctx, entity)?;
        let id = remote_id_of(entity)?;
        self.entities.write().remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpsync_core::{ConsumerSpec, ObjectMeta};

    fn consumer(name: &str) -> Entity<ConsumerSpec> {
        Entity::new(
            ObjectMeta::new("default", name),
            ConsumerSpec {
                control_plane_ref: "cp".into(),
                username: name.into(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn create_update_delete() {
        let remote = MemoryRemote::new();
        let ctx = OpContext::new();
        let mut alice = consumer("alice");

        RemoteAdapter::create(&remote, &ctx, &mut alice).unwrap();
        let id = alice.remote_id().unwrap().to_owned();
        assert_eq!(remote.get(&id).unwrap().version, 1);

        alice.spec.custom_id = Some("ext-1".into());
        RemoteAdapter::update(&remote, &ctx, &mut alice).unwrap();
        let record = remote.get(&id).unwrap();
        assert_eq!(record.version, 2);
        assert_eq!(record.payload["customId"], "ext-1");

        RemoteAdapter::delete(&remote, &ctx, &mut alice).unwrap();
        assert!(remote.is_empty());
        assert_eq!(remote.seen_ids(Op::Delete), vec![id]);
    }

    #[test]
    fn delete_of_absent_entity_succeeds() {
        let remote = MemoryRemote::new();
        let mut ghost = consumer("ghost").with_remote_id("gone");
        RemoteAdapter::delete(&remote, &OpContext::new(), &mut ghost).unwrap();
        assert_eq!(remote.calls(Op::Delete), 1);
    }

    #[test]
    fn update_of_absent_entity_is_not_found() {
        let remote = MemoryRemote::new();
        let mut ghost = consumer("ghost").with_remote_id("gone");
        let err = RemoteAdapter::update(&remote, &OpContext::new(), &mut ghost).unwrap_err();
        assert_eq!(err, AdapterError::NotFound("gone".into()));
    }

    #[test]
    fn duplicate_create_conflicts() {
        let remote = MemoryRemote::new();
        let ctx = OpContext::new();
        RemoteAdapter::create(&remote, &ctx, &mut consumer("bob")).unwrap();
        let err = RemoteAdapter::create(&remote, &ctx, &mut consumer("bob")).unwrap_err();
        assert!(matches!(err, AdapterError::Conflict(_)));
        assert_eq!(remote.len(), 1);
    }

    #[test]
    fn injected_failures_and_cancellation() {
        let remote = MemoryRemote::new();
        remote.fail_on(Op::Create, AdapterError::transport_retryable("reset"));

        let mut carol = consumer("carol");
        let err = RemoteAdapter::create(&remote, &OpContext::new(), &mut carol).unwrap_err();
        assert!(err.is_retryable());
        assert!(carol.remote_id().is_none());

        remote.clear_failures();
        let ctx = OpContext::new();
        ctx.cancel();
        let err = RemoteAdapter::create(&remote, &ctx, &mut carol).unwrap_err();
        assert_eq!(err, AdapterError::Cancelled);
        assert_eq!(remote.calls(Op::Create), 2);
        assert!(remote.is_empty());
    }

    #[test]
    fn snapshot_round_trip() {
        let remote = MemoryRemote::new();
        RemoteAdapter::create(&remote, &OpContext::new(), &mut consumer("dave")).unwrap();

        let restored = MemoryRemote::from_snapshot(remote.snapshot());
        assert_eq!(restored.snapshot(), remote.snapshot());
        assert_eq!(restored.calls(Op::Create), 0);
    }
}
