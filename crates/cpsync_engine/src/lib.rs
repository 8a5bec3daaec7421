//! # cpsync engine
//!
//! Generic remote-entity synchronization core.
//!
//! This crate provides:
//! - A dispatcher routing create/update/delete to one adapter per entity kind
//! - A staleness gate that skips updates for entities known to be in sync
//! - Uniform telemetry (timing, structured logs, counters) for every operation
//! - Normalized errors carrying operation, kind, key and remote identity
//! - An in-memory remote control plane for tests and local runs
//!
//! ## Architecture
//!
//! The engine is synchronous and holds no state across calls apart from
//! operation counters. An external scheduler decides when an entity is
//! handed in, and uses the returned error or requeue hint to decide when
//! it comes back:
//! 1. Preconditions are checked (adapter bound, remote identity present)
//! 2. Updates consult the staleness gate and may return early
//! 3. The adapter for the entity's kind performs the remote call
//! 4. Telemetry fires once and failures are normalized
//!
//! ## Key Invariants
//!
//! - No operation is retried internally
//! - Update and delete never reach an adapter without a remote identity
//! - A fresh entity never reaches an adapter on update
//! - Telemetry fires exactly once per call

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod adapter;
mod clock;
mod config;
mod context;
mod dispatch;
mod error;
mod gate;
mod memory;
mod op;
mod status;
mod telemetry;

pub use adapter::{AdapterSet, Dispatchable, RemoteAdapter};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{SyncConfig, DEFAULT_SYNC_PERIOD};
pub use context::OpContext;
pub use dispatch::{Dispatcher, UpdateOutcome};
pub use error::{AdapterError, AdapterResult, SyncError, SyncResult};
pub use gate::{check_freshness, Freshness, StaleReason};
pub use memory::{MemoryRemote, RemoteRecord, RemoteSnapshot};
pub use op::{Op, OperationRecord};
pub use status::{mark_failed, mark_programmed};
pub use telemetry::{OperationStats, OperationStatsSnapshot, Outcome};
