//! Remote adapter abstraction.

use crate::context::OpContext;
use crate::error::AdapterResult;
use cpsync_core::{
    ConsumerGroupSpec, ConsumerSpec, ControlPlaneSpec, Entity, EntitySpec, RouteSpec, ServiceSpec,
};
use std::fmt;
use std::sync::Arc;

/// Performs create/update/delete for one entity kind against the remote API.
///
/// Contract:
/// - `create` records the new remote identity on the entity when it succeeds.
/// - `update` and `delete` are only called with a remote identity set.
/// - `delete` of an entity that is already absent remotely succeeds.
/// - Adapters own retries, timeouts and transport concerns, and should
///   honor the cancellation and deadline carried by `ctx`.
pub trait RemoteAdapter<S: EntitySpec>: Send + Sync {
    /// Creates the entity remotely.
    fn create(&self, ctx: &OpContext, entity: &mut Entity<S>) -> AdapterResult<()>;

    /// Updates the remote counterpart.
    fn update(&self, ctx: &OpContext, entity: &mut Entity<S>) -> AdapterResult<()>;

    /// Deletes the remote counterpart.
    fn delete(&self, ctx: &OpContext, entity: &mut Entity<S>) -> AdapterResult<()>;
}

/// The adapter bound to each supported entity kind.
///
/// Built once at startup and handed to the [`Dispatcher`](crate::Dispatcher).
/// A kind left unbound makes every dispatch for it fail with
/// [`SyncError::UnsupportedKind`](crate::SyncError::UnsupportedKind).
#[derive(Clone, Default)]
pub struct AdapterSet {
    control_planes: Option<Arc<dyn RemoteAdapter<ControlPlaneSpec>>>,
    services: Option<Arc<dyn RemoteAdapter<ServiceSpec>>>,
    routes: Option<Arc<dyn RemoteAdapter<RouteSpec>>>,
    consumers: Option<Arc<dyn RemoteAdapter<ConsumerSpec>>>,
    consumer_groups: Option<Arc<dyn RemoteAdapter<ConsumerGroupSpec>>>,
}

impl AdapterSet {
    /// Creates a set with no adapter bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds one adapter implementation to every kind.
    pub fn uniform<A>(adapter: Arc<A>) -> Self
    where
        A: RemoteAdapter<ControlPlaneSpec>
            + RemoteAdapter<ServiceSpec>
            + RemoteAdapter<RouteSpec>
            + RemoteAdapter<ConsumerSpec>
            + RemoteAdapter<ConsumerGroupSpec>
            + 'static,
    {
        Self {
            control_planes: Some(adapter.clone()),
            services: Some(adapter.clone()),
            routes: Some(adapter.clone()),
            consumers: Some(adapter.clone()),
            consumer_groups: Some(adapter),
        }
    }

    /// Binds the control plane adapter.
    pub fn with_control_planes(mut self, adapter: Arc<dyn RemoteAdapter<ControlPlaneSpec>>) -> Self {
        self.control_planes = Some(adapter);
        self
    }

    /// Binds the service adapter.
    pub fn with_services(mut self, adapter: Arc<dyn RemoteAdapter<ServiceSpec>>) -> Self {
        self.services = Some(adapter);
        self
    }

    /// Binds the route adapter.
    pub fn with_routes(mut self, adapter: Arc<dyn RemoteAdapter<RouteSpec>>) -> Self {
        self.routes = Some(adapter);
        self
    }

    /// Binds the consumer adapter.
    pub fn with_consumers(mut self, adapter: Arc<dyn RemoteAdapter<ConsumerSpec>>) -> Self {
        self.consumers = Some(adapter);
        self
    }

    /// Binds the consumer group adapter.
    pub fn with_consumer_groups(
        mut self,
        adapter: Arc<dyn RemoteAdapter<ConsumerGroupSpec>>,
    ) -> Self {
        self.consumer_groups = Some(adapter);
        self
    }
}

impl fmt::Debug for AdapterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterSet")
            .field("control_planes", &self.control_planes.is_some())
            .field("services", &self.services.is_some())
            .field("routes", &self.routes.is_some())
            .field("consumers", &self.consumers.is_some())
            .field("consumer_groups", &self.consumer_groups.is_some())
            .finish()
    }
}

/// A spec type with an adapter slot in [`AdapterSet`].
///
/// This is the static kind-to-adapter mapping: every supported kind has
/// exactly one slot, resolved at compile time.
pub trait Dispatchable: EntitySpec {
    /// Returns the adapter bound for this kind, if any.
    fn adapter(adapters: &AdapterSet) -> Option<&dyn RemoteAdapter<Self>>;
}

impl Dispatchable for ControlPlaneSpec {
    fn adapter(adapters: &AdapterSet) -> Option<&dyn RemoteAdapter<Self>> {
        adapters.control_planes.as_deref()
    }
}

impl Dispatchable for ServiceSpec {
    fn adapter(adapters: &AdapterSet) -> Option<&dyn RemoteAdapter<Self>> {
        adapters.services.as_deref()
    }
}

impl Dispatchable for RouteSpec {
    fn adapter(adapters: &AdapterSet) -> Option<&dyn RemoteAdapter<Self>> {
        adapters.routes.as_deref()
    }
}

impl Dispatchable for ConsumerSpec {
    fn adapter(adapters: &AdapterSet) -> Option<&dyn RemoteAdapter<Self>> {
        adapters.consumers.as_deref()
    }
}

impl Dispatchable for ConsumerGroupSpec {
    fn adapter(adapters: &AdapterSet) -> Option<&dyn RemoteAdapter<Self>> {
        adapters.consumer_groups.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRemote;

    #[test]
    fn empty_set_binds_nothing() {
        let set = AdapterSet::new();
        assert!(ServiceSpec::adapter(&set).is_none());
        assert!(ControlPlaneSpec::adapter(&set).is_none());
    }

    #[test]
    fn uniform_binds_every_kind() {
        let set = AdapterSet::uniform(Arc::new(MemoryRemote::new()));
        assert!(ControlPlaneSpec::adapter(&set).is_some());
        assert!(ServiceSpec::adapter(&set).is_some());
        assert!(RouteSpec::adapter(&set).is_some());
        assert!(ConsumerSpec::adapter(&set).is_some());
        assert!(ConsumerGroupSpec::adapter(&set).is_some());
    }

    #[test]
    fn builder_binds_single_kind() {
        let set = AdapterSet::new().with_routes(Arc::new(MemoryRemote::new()));
        assert!(RouteSpec::adapter(&set).is_some());
        assert!(ServiceSpec::adapter(&set).is_none());
        assert_eq!(
            format!("{set:?}"),
            "AdapterSet { control_planes: false, services: false, routes: true, consumers: false, consumer_groups: false }"
        );
    }
}
