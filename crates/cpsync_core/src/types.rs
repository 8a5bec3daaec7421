//! Core type definitions for cpsync.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable local identity of an entity.
///
/// Keys are `namespace/name` pairs. Cluster-scoped entities use an empty
/// namespace and display as the bare name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    /// Namespace, empty for cluster-scoped entities.
    #[serde(default)]
    pub namespace: String,
    /// Name, unique within the namespace.
    pub name: String,
}

impl ObjectKey {
    /// Creates a namespaced key.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Creates a cluster-scoped key.
    #[must_use]
    pub fn cluster_scoped(name: impl Into<String>) -> Self {
        Self::new(String::new(), name)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

impl FromStr for ObjectKey {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        let invalid = || CoreError::InvalidKey { input: s.into() };
        match s.split_once('/') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::new(ns, name))
            }
            Some(_) => Err(invalid()),
            None if !s.is_empty() => Ok(Self::cluster_scoped(s)),
            None => Err(invalid()),
        }
    }
}

/// Spec generation of an entity.
///
/// The owning configuration source bumps the generation on every spec
/// change; conditions record the generation they were observed at.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Generation(pub i64);

impl Generation {
    /// Creates a generation.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }

    /// Returns the next generation.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_display() {
        assert_eq!(ObjectKey::new("default", "svc").to_string(), "default/svc");
        assert_eq!(ObjectKey::cluster_scoped("cp").to_string(), "cp");
    }

    #[test]
    fn object_key_parse() {
        let key: ObjectKey = "team-a/billing".parse().unwrap();
        assert_eq!(key, ObjectKey::new("team-a", "billing"));

        let key: ObjectKey = "cp".parse().unwrap();
        assert_eq!(key, ObjectKey::cluster_scoped("cp"));

        assert!("".parse::<ObjectKey>().is_err());
        assert!("/name".parse::<ObjectKey>().is_err());
        assert!("ns/".parse::<ObjectKey>().is_err());
        assert!("a/b/c".parse::<ObjectKey>().is_err());
    }

    #[test]
    fn generation_next() {
        let g = Generation::new(4);
        assert_eq!(g.next().as_i64(), 5);
        assert!(g < g.next());
        assert_eq!(format!("{g}"), "gen:4");
    }
}
