//! Error types for the sync engine.
//!
//! Adapters report [`AdapterError`]. The dispatcher never returns those
//! directly: every adapter failure is wrapped into
//! [`SyncError::RemoteOperationFailed`] together with the operation, entity
//! kind, key and remote identity. The original error stays reachable
//! through [`std::error::Error::source`].

use crate::op::Op;
use cpsync_core::{EntityKind, ObjectKey, SyncEntity};
use thiserror::Error;

/// Result type for adapter calls.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Result type for dispatcher calls.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors reported by remote adapters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// The remote API answered with an error status.
    #[error("remote API returned {status}: {message}")]
    Api {
        /// HTTP-like status code.
        status: u16,
        /// Error message from the remote API.
        message: String,
    },

    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The remote counterpart does not exist.
    #[error("remote entity not found: {0}")]
    NotFound(String),

    /// The remote API rejected the entity as conflicting with existing state.
    #[error("remote entity conflict: {0}")]
    Conflict(String),

    /// The entity cannot be expressed in the remote API.
    #[error("invalid entity: {0}")]
    Invalid(String),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl AdapterError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a remote API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            AdapterError::Api { status, .. } => *status == 429 || *status >= 500,
            AdapterError::Transport { retryable, .. } => *retryable,
            AdapterError::DeadlineExceeded => true,
            _ => false,
        }
    }
}

/// Errors returned by the dispatcher.
#[derive(Error, Debug)]
pub enum SyncError {
    /// No adapter is bound for the entity kind. This is a wiring defect.
    #[error("unsupported entity kind {kind}: no remote adapter bound")]
    UnsupportedKind {
        /// Entity kind.
        kind: EntityKind,
    },

    /// Update or delete was requested before the entity got a remote identity.
    #[error("can't {op} {kind} {key} when it does not have the remote ID")]
    MissingRemoteId {
        /// Operation kind.
        op: Op,
        /// Entity kind.
        kind: EntityKind,
        /// Entity key.
        key: ObjectKey,
    },

    /// The adapter reported a failure.
    #[error(
        "failed to {op} {kind} {key}{}: {source}",
        display_remote_id(.remote_id.as_deref())
    )]
    RemoteOperationFailed {
        /// Operation kind.
        op: Op,
        /// Entity kind.
        kind: EntityKind,
        /// Entity key.
        key: ObjectKey,
        /// Remote identity, if one was known.
        remote_id: Option<String>,
        /// Adapter error.
        #[source]
        source: AdapterError,
    },
}

fn display_remote_id(remote_id: Option<&str>) -> String {
    remote_id
        .map(|id| format!(" (remote ID {id:?})"))
        .unwrap_or_default()
}

impl SyncError {
    /// Wraps an adapter failure for `entity`.
    pub fn remote_failed(op: Op, entity: &dyn SyncEntity, source: AdapterError) -> Self {
        Self::RemoteOperationFailed {
            op,
            kind: entity.kind(),
            key: entity.key(),
            remote_id: entity.remote_id().map(str::to_owned),
            source,
        }
    }

    pub(crate) fn missing_remote_id(op: Op, entity: &dyn SyncEntity) -> Self {
        Self::MissingRemoteId {
            op,
            kind: entity.kind(),
            key: entity.key(),
        }
    }

    /// Returns the entity kind the error is about.
    pub fn kind(&self) -> EntityKind {
        match self {
            SyncError::UnsupportedKind { kind }
            | SyncError::MissingRemoteId { kind, .. }
            | SyncError::RemoteOperationFailed { kind, .. } => *kind,
        }
    }

    /// Returns the wrapped adapter error, if any.
    pub fn adapter_error(&self) -> Option<&AdapterError> {
        match self {
            SyncError::RemoteOperationFailed { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns true if the caller may retry the same call later.
    ///
    /// Only adapter failures can be transient; precondition and wiring
    /// errors need a different call or a code change.
    pub fn is_retryable(&self) -> bool {
        self.adapter_error().is_some_and(AdapterError::is_retryable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpsync_core::{Entity, ObjectMeta, ServiceSpec};
    use std::error::Error as _;

    fn service(remote_id: Option<&str>) -> Entity<ServiceSpec> {
        let svc = Entity::new(ObjectMeta::new("default", "billing"), ServiceSpec::default());
        match remote_id {
            Some(id) => svc.with_remote_id(id),
            None => svc,
        }
    }

    #[test]
    fn retryable_adapter_errors() {
        assert!(AdapterError::transport_retryable("connection reset").is_retryable());
        assert!(!AdapterError::transport_fatal("bad certificate").is_retryable());
        assert!(AdapterError::api(503, "unavailable").is_retryable());
        assert!(AdapterError::api(429, "slow down").is_retryable());
        assert!(!AdapterError::api(400, "bad request").is_retryable());
        assert!(AdapterError::DeadlineExceeded.is_retryable());
        assert!(!AdapterError::Cancelled.is_retryable());
        assert!(!AdapterError::Conflict("name taken".into()).is_retryable());
    }

    #[test]
    fn message_includes_known_remote_id() {
        let err = SyncError::remote_failed(
            Op::Update,
            &service(Some("abc")),
            AdapterError::api(500, "boom"),
        );
        let msg = err.to_string();
        assert_eq!(
            msg,
            "failed to update Service default/billing (remote ID \"abc\"): remote API returned 500: boom"
        );
    }

    #[test]
    fn message_omits_unknown_remote_id() {
        let err = SyncError::remote_failed(
            Op::Create,
            &service(None),
            AdapterError::Conflict("name taken".into()),
        );
        assert_eq!(
            err.to_string(),
            "failed to create Service default/billing: remote entity conflict: name taken"
        );
    }

    #[test]
    fn cause_is_reachable_through_source() {
        let err = SyncError::remote_failed(
            Op::Delete,
            &service(Some("abc")),
            AdapterError::transport_retryable("reset"),
        );
        let source = err.source().unwrap();
        let adapter = source.downcast_ref::<AdapterError>().unwrap();
        assert_eq!(adapter, &AdapterError::transport_retryable("reset"));
        assert!(err.is_retryable());
        assert_eq!(err.kind(), EntityKind::Service);
    }

    #[test]
    fn precondition_errors_are_not_retryable() {
        let err = SyncError::missing_remote_id(Op::Delete, &service(None));
        assert_eq!(
            err.to_string(),
            "can't delete Service default/billing when it does not have the remote ID"
        );
        assert!(!err.is_retryable());
        assert!(err.adapter_error().is_none());

        let err = SyncError::UnsupportedKind {
            kind: EntityKind::Route,
        };
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("Route"));
    }
}
