//! Typed entities and the capability trait the sync engine works through.

use crate::condition::Conditions;
use crate::kind::EntityKind;
use crate::types::{Generation, ObjectKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::time::SystemTime;

/// Object metadata shared by every entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Namespace, empty for cluster-scoped entities.
    #[serde(default)]
    pub namespace: String,
    /// Name.
    pub name: String,
    /// Spec generation.
    #[serde(default)]
    pub generation: Generation,
    /// Set once the owner asked for the entity to be removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<SystemTime>,
}

impl ObjectMeta {
    /// Creates metadata at generation 1.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            generation: Generation::new(1),
            deletion_timestamp: None,
        }
    }

    /// Returns the object key.
    #[must_use]
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }
}

/// Status written by the sync engine and its callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityStatus {
    /// Identity assigned by the remote control plane on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    /// Status conditions.
    #[serde(default)]
    pub conditions: Conditions,
}

/// A spec type bound to exactly one entity kind.
pub trait EntitySpec:
    Debug + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Kind of entities carrying this spec.
    const KIND: EntityKind;

    /// Name of the control plane this entity lives in, if any.
    fn control_plane_ref(&self) -> Option<&str> {
        None
    }
}

/// A locally declared entity mirrored to the remote control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity<S> {
    /// Object metadata.
    pub metadata: ObjectMeta,
    /// Desired state.
    pub spec: S,
    /// Observed state.
    #[serde(default)]
    pub status: EntityStatus,
}

impl<S: EntitySpec> Entity<S> {
    /// Creates an entity with empty status.
    #[must_use]
    pub fn new(metadata: ObjectMeta, spec: S) -> Self {
        Self {
            metadata,
            spec,
            status: EntityStatus::default(),
        }
    }

    /// Sets the remote identity.
    #[must_use]
    pub fn with_remote_id(mut self, id: impl Into<String>) -> Self {
        self.status.remote_id = Some(id.into());
        self
    }

    /// Returns true if the owner asked for removal.
    #[must_use]
    pub fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }
}

/// The capabilities the sync engine needs from an entity, independent of kind.
pub trait SyncEntity {
    /// Entity kind.
    fn kind(&self) -> EntityKind;

    /// Stable local identity.
    fn key(&self) -> ObjectKey;

    /// Current spec generation.
    fn generation(&self) -> Generation;

    /// Status conditions.
    fn conditions(&self) -> &Conditions;

    /// Mutable status conditions.
    fn conditions_mut(&mut self) -> &mut Conditions;

    /// Remote identity, `None` when unset or empty.
    fn remote_id(&self) -> Option<&str>;

    /// Records the remote identity.
    fn set_remote_id(&mut self, id: String);
}

impl<S: EntitySpec> SyncEntity for Entity<S> {
    fn kind(&self) -> EntityKind {
        S::KIND
    }

    fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    fn generation(&self) -> Generation {
        self.metadata.generation
    }

    fn conditions(&self) -> &Conditions {
        &self.status.conditions
    }

    fn conditions_mut(&mut self) -> &mut Conditions {
        &mut self.status.conditions
    }

    fn remote_id(&self) -> Option<&str> {
        self.status.remote_id.as_deref().filter(|id| !id.is_empty())
    }

    fn set_remote_id(&mut self, id: String) {
        self.status.remote_id = Some(id);
    }
}

/// Desired state of a remote control plane.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneSpec {
    /// Display name in the remote system.
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Remote labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl EntitySpec for ControlPlaneSpec {
    const KIND: EntityKind = EntityKind::ControlPlane;
}

/// Desired state of an upstream service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    /// Owning control plane.
    pub control_plane_ref: String,
    /// Upstream host.
    pub host: String,
    /// Upstream port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upstream protocol.
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Upstream path prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

fn default_port() -> u16 {
    80
}

fn default_protocol() -> String {
    "http".into()
}

impl EntitySpec for ServiceSpec {
    const KIND: EntityKind = EntityKind::Service;

    fn control_plane_ref(&self) -> Option<&str> {
        Some(&self.control_plane_ref)
    }
}

/// Desired state of a route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    /// Owning control plane.
    pub control_plane_ref: String,
    /// Service the route forwards to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_ref: Option<String>,
    /// Matched path prefixes.
    #[serde(default)]
    pub paths: Vec<String>,
    /// Matched HTTP methods.
    #[serde(default)]
    pub methods: Vec<String>,
    /// Matched hosts.
    #[serde(default)]
    pub hosts: Vec<String>,
    /// Whether the matched prefix is stripped before forwarding.
    #[serde(default = "default_strip_path")]
    pub strip_path: bool,
}

fn default_strip_path() -> bool {
    true
}

impl EntitySpec for RouteSpec {
    const KIND: EntityKind = EntityKind::Route;

    fn control_plane_ref(&self) -> Option<&str> {
        Some(&self.control_plane_ref)
    }
}

/// Desired state of an API consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerSpec {
    /// Owning control plane.
    pub control_plane_ref: String,
    /// Unique username.
    pub username: String,
    /// Identifier from an external system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    /// Consumer groups the consumer belongs to.
    #[serde(default)]
    pub consumer_groups: Vec<String>,
}

impl EntitySpec for ConsumerSpec {
    const KIND: EntityKind = EntityKind::Consumer;

    fn control_plane_ref(&self) -> Option<&str> {
        Some(&self.control_plane_ref)
    }
}

/// Desired state of a consumer group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerGroupSpec {
    /// Owning control plane.
    pub control_plane_ref: String,
    /// Group name in the remote system.
    pub name: String,
}

impl EntitySpec for ConsumerGroupSpec {
    const KIND: EntityKind = EntityKind::ConsumerGroup;

    fn control_plane_ref(&self) -> Option<&str> {
        Some(&self.control_plane_ref)
    }
}

/// A remote control plane entity.
pub type ControlPlane = Entity<ControlPlaneSpec>;
/// A service entity.
pub type Service = Entity<ServiceSpec>;
/// A route entity.
pub type Route = Entity<RouteSpec>;
/// A consumer entity.
pub type Consumer = Entity<ConsumerSpec>;
/// A consumer group entity.
pub type ConsumerGroup = Entity<ConsumerGroupSpec>;

/// An entity of any supported kind, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AnyEntity {
    /// A control plane.
    ControlPlane(ControlPlane),
    /// A service.
    Service(Service),
    /// A route.
    Route(Route),
    /// A consumer.
    Consumer(Consumer),
    /// A consumer group.
    ConsumerGroup(ConsumerGroup),
}

impl AnyEntity {
    /// Returns the entity through its kind-independent capabilities.
    #[must_use]
    pub fn as_sync_entity(&self) -> &dyn SyncEntity {
        match self {
            AnyEntity::ControlPlane(e) => e,
            AnyEntity::Service(e) => e,
            AnyEntity::Route(e) => e,
            AnyEntity::Consumer(e) => e,
            AnyEntity::ConsumerGroup(e) => e,
        }
    }

    /// Mutable variant of [`AnyEntity::as_sync_entity`].
    pub fn as_sync_entity_mut(&mut self) -> &mut dyn SyncEntity {
        match self {
            AnyEntity::ControlPlane(e) => e,
            AnyEntity::Service(e) => e,
            AnyEntity::Route(e) => e,
            AnyEntity::Consumer(e) => e,
            AnyEntity::ConsumerGroup(e) => e,
        }
    }

    /// Returns the object metadata.
    #[must_use]
    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            AnyEntity::ControlPlane(e) => &e.metadata,
            AnyEntity::Service(e) => &e.metadata,
            AnyEntity::Route(e) => &e.metadata,
            AnyEntity::Consumer(e) => &e.metadata,
            AnyEntity::ConsumerGroup(e) => &e.metadata,
        }
    }

    /// Returns the owning control plane name, if any.
    #[must_use]
    pub fn control_plane_ref(&self) -> Option<&str> {
        match self {
            AnyEntity::ControlPlane(e) => e.spec.control_plane_ref(),
            AnyEntity::Service(e) => e.spec.control_plane_ref(),
            AnyEntity::Route(e) => e.spec.control_plane_ref(),
            AnyEntity::Consumer(e) => e.spec.control_plane_ref(),
            AnyEntity::ConsumerGroup(e) => e.spec.control_plane_ref(),
        }
    }

    /// Returns true if the owner asked for removal.
    #[must_use]
    pub fn is_being_deleted(&self) -> bool {
        self.metadata().deletion_timestamp.is_some()
    }
}

impl From<ControlPlane> for AnyEntity {
    fn from(e: ControlPlane) -> Self {
        AnyEntity::ControlPlane(e)
    }
}

impl From<Service> for AnyEntity {
    fn from(e: Service) -> Self {
        AnyEntity::Service(e)
    }
}

impl From<Route> for AnyEntity {
    fn from(e: Route) -> Self {
        AnyEntity::Route(e)
    }
}

impl From<Consumer> for AnyEntity {
    fn from(e: Consumer) -> Self {
        AnyEntity::Consumer(e)
    }
}

impl From<ConsumerGroup> for AnyEntity {
    fn from(e: ConsumerGroup) -> Self {
        AnyEntity::ConsumerGroup(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> Service {
        Entity::new(
            ObjectMeta::new("default", "billing"),
            ServiceSpec {
                control_plane_ref: "cp".into(),
                host: "billing.internal".into(),
                port: 8080,
                protocol: "http".into(),
                path: None,
            },
        )
    }

    #[test]
    fn sync_entity_capabilities() {
        let mut svc = service();
        assert_eq!(svc.kind(), EntityKind::Service);
        assert_eq!(svc.key(), ObjectKey::new("default", "billing"));
        assert_eq!(svc.generation(), Generation::new(1));
        assert!(svc.remote_id().is_none());

        svc.set_remote_id("abc".into());
        assert_eq!(svc.remote_id(), Some("abc"));
    }

    #[test]
    fn empty_remote_id_reads_as_none() {
        let svc = service().with_remote_id("");
        assert!(svc.remote_id().is_none());
    }

    #[test]
    fn any_entity_tagged_by_kind() {
        let any = AnyEntity::from(service());
        let json = serde_json::to_value(&any).unwrap();
        assert_eq!(json["kind"], "Service");
        assert_eq!(json["spec"]["controlPlaneRef"], "cp");

        let back: AnyEntity = serde_json::from_value(json).unwrap();
        assert_eq!(back.as_sync_entity().kind(), EntityKind::Service);
        assert_eq!(back.control_plane_ref(), Some("cp"));
    }

    #[test]
    fn spec_defaults_apply_on_deserialize() {
        let json = serde_json::json!({
            "kind": "Route",
            "metadata": { "namespace": "default", "name": "r1" },
            "spec": { "controlPlaneRef": "cp", "paths": ["/v1"] }
        });
        let any: AnyEntity = serde_json::from_value(json).unwrap();
        let AnyEntity::Route(route) = any else {
            panic!("expected a route");
        };
        assert!(route.spec.strip_path);
        assert_eq!(route.metadata.generation, Generation::default());
        assert!(route.status.conditions.is_empty());
        assert!(!route.is_being_deleted());
    }
}
