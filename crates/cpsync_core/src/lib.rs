//! # cpsync core
//!
//! Entity model for cpsync.
//!
//! This crate provides:
//! - Object keys and generations for locally declared entities
//! - The closed set of entity kinds mirrored to the remote control plane
//! - Typed entities (`Entity<Spec>`) and the `SyncEntity` capability trait
//! - The per-entity condition store
//!
//! It performs no I/O. The synchronization engine lives in `cpsync_engine`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod condition;
mod entity;
mod error;
mod kind;
mod types;

pub use condition::{condition_types, reasons, Condition, ConditionStatus, Conditions};
pub use entity::{
    AnyEntity, Consumer, ConsumerGroup, ConsumerGroupSpec, ConsumerSpec, ControlPlane,
    ControlPlaneSpec, Entity, EntitySpec, EntityStatus, ObjectMeta, Route, RouteSpec, Service,
    ServiceSpec, SyncEntity,
};
pub use error::{CoreError, CoreResult};
pub use kind::EntityKind;
pub use types::{Generation, ObjectKey};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
