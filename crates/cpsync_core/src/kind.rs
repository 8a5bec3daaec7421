//! Entity kinds.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of entity kinds mirrored to the remote control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A remote control plane. Every other kind lives inside one.
    ControlPlane,
    /// An upstream service.
    Service,
    /// A route in front of a service.
    Route,
    /// An API consumer.
    Consumer,
    /// A group of consumers.
    ConsumerGroup,
}

impl EntityKind {
    /// All kinds, parents before children.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::ControlPlane,
        EntityKind::Service,
        EntityKind::Route,
        EntityKind::Consumer,
        EntityKind::ConsumerGroup,
    ];

    /// Returns the kind name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            EntityKind::ControlPlane => "ControlPlane",
            EntityKind::Service => "Service",
            EntityKind::Route => "Route",
            EntityKind::Consumer => "Consumer",
            EntityKind::ConsumerGroup => "ConsumerGroup",
        }
    }

    /// Returns true if entities of this kind live inside a control plane.
    #[must_use]
    pub const fn is_control_plane_scoped(self) -> bool {
        !matches!(self, EntityKind::ControlPlane)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::UnknownKind { name: s.into() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.name().parse::<EntityKind>().unwrap(), kind);
        }
        assert_eq!("route".parse::<EntityKind>().unwrap(), EntityKind::Route);
        assert!("Plugin".parse::<EntityKind>().is_err());
    }

    #[test]
    fn control_plane_scope() {
        assert!(!EntityKind::ControlPlane.is_control_plane_scoped());
        assert!(EntityKind::Route.is_control_plane_scoped());
    }
}
