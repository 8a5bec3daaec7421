//! Status conditions.
//!
//! A [`Conditions`] set holds at most one [`Condition`] per type. Writing a
//! condition whose status did not change keeps the previous
//! `last_transition_time`, so the timestamp always marks the last status
//! flip rather than the last write.

use crate::types::Generation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Well-known condition types.
pub mod condition_types {
    /// Whether the entity has been programmed in the remote control plane.
    pub const PROGRAMMED: &str = "Programmed";
    /// Whether the API auth configuration reference resolves to an existing object.
    pub const API_AUTH_RESOLVED_REF: &str = "APIAuthResolvedRef";
    /// Whether the referenced API auth configuration is valid.
    pub const API_AUTH_VALID: &str = "APIAuthValid";
    /// Whether the control plane reference points to an existing control plane.
    pub const CONTROL_PLANE_REF_VALID: &str = "ControlPlaneRefValid";
    /// Whether the service reference points to an existing service.
    pub const SERVICE_REF_VALID: &str = "ServiceRefValid";
}

/// Well-known condition reasons.
pub mod reasons {
    /// The entity has been programmed in the remote control plane.
    pub const PROGRAMMED: &str = "Programmed";
    /// The last remote API operation for the entity failed.
    pub const REMOTE_API_OP_FAILED: &str = "RemoteAPIOpFailed";
    /// A reference has been resolved.
    pub const RESOLVED_REF: &str = "ResolvedRef";
    /// A referenced object does not exist.
    pub const REF_NOT_FOUND: &str = "RefNotFound";
    /// A reference is malformed. The condition message carries details.
    pub const REF_INVALID: &str = "RefInvalid";
    /// The referenced object is valid.
    pub const VALID: &str = "Valid";
    /// The referenced object is invalid.
    pub const INVALID: &str = "Invalid";
}

/// Tri-state condition status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionStatus {
    /// The condition holds.
    True,
    /// The condition does not hold.
    False,
    /// Not yet determined.
    #[default]
    Unknown,
}

impl ConditionStatus {
    /// Returns the status name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        }
    }
}

impl From<bool> for ConditionStatus {
    fn from(value: bool) -> Self {
        if value {
            ConditionStatus::True
        } else {
            ConditionStatus::False
        }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed, timestamped status assertion about an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type, unique within a [`Conditions`] set.
    #[serde(rename = "type")]
    pub type_: String,
    /// Condition status.
    pub status: ConditionStatus,
    /// Machine-readable reason for the last transition.
    #[serde(default)]
    pub reason: String,
    /// Human-readable details.
    #[serde(default)]
    pub message: String,
    /// Entity generation the condition was computed for.
    #[serde(default)]
    pub observed_generation: Generation,
    /// Time of the last status change.
    pub last_transition_time: SystemTime,
}

impl Condition {
    /// Creates a condition with empty reason and message.
    #[must_use]
    pub fn new(type_: impl Into<String>, status: ConditionStatus, now: SystemTime) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: String::new(),
            message: String::new(),
            observed_generation: Generation::default(),
            last_transition_time: now,
        }
    }

    /// Sets the reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Sets the observed generation.
    #[must_use]
    pub fn with_observed_generation(mut self, generation: Generation) -> Self {
        self.observed_generation = generation;
        self
    }

    /// Returns true if the status is `True`.
    #[must_use]
    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

/// The condition store of a single entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conditions(Vec<Condition>);

impl Conditions {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the condition of the given type.
    #[must_use]
    pub fn get(&self, type_: &str) -> Option<&Condition> {
        self.0.iter().find(|c| c.type_ == type_)
    }

    /// Returns true if a condition of the given type exists with status `True`.
    #[must_use]
    pub fn is_true(&self, type_: &str) -> bool {
        self.get(type_).is_some_and(Condition::is_true)
    }

    /// Inserts or replaces the condition of the same type.
    ///
    /// When the stored status equals the new one, the stored
    /// `last_transition_time` is kept. Returns true if anything changed.
    pub fn set(&mut self, mut condition: Condition) -> bool {
        match self.0.iter_mut().find(|c| c.type_ == condition.type_) {
            Some(existing) => {
                if existing.status == condition.status {
                    condition.last_transition_time = existing.last_transition_time;
                }
                if *existing == condition {
                    return false;
                }
                *existing = condition;
                true
            }
            None => {
                self.0.push(condition);
                true
            }
        }
    }

    /// Removes and returns the condition of the given type.
    pub fn remove(&mut self, type_: &str) -> Option<Condition> {
        let idx = self.0.iter().position(|c| c.type_ == type_)?;
        Some(self.0.remove(idx))
    }

    /// Iterates over the stored conditions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.0.iter()
    }

    /// Returns the number of stored conditions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no condition is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
