//! State file holding local entities and the remote snapshot.

use cpsync_core::AnyEntity;
use cpsync_engine::RemoteSnapshot;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reading or writing a state file.
#[derive(Debug, Error)]
pub enum StateError {
    /// The file could not be read or written.
    #[error("state file {}: {source}", .path.display())]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The file contents are not a valid state document.
    #[error("invalid state file {}: {source}", .path.display())]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Contents of a state file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    /// Locally declared entities.
    #[serde(default)]
    pub entities: Vec<AnyEntity>,
    /// Contents of the remote control plane.
    #[serde(default)]
    pub remote: RemoteSnapshot,
}

impl StateFile {
    /// Reads a state file.
    pub fn load(path: &Path) -> Result<Self, StateError> {
        let data = std::fs::read(path).map_err(|source| StateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&data).map_err(|source| StateError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the state file, replacing it atomically.
    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        let data = serde_json::to_vec_pretty(self).map_err(|source| StateError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let tmp = path.with_extension("tmp");
        let io_err = |source| StateError::Io {
            path: path.to_path_buf(),
            source,
        };
        std::fs::write(&tmp, data).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpsync_core::{ControlPlaneSpec, Entity, ObjectMeta};

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let state = StateFile {
            entities: vec![Entity::new(
                ObjectMeta::new("", "prod"),
                ControlPlaneSpec {
                    name: "prod".into(),
                    ..Default::default()
                },
            )
            .into()],
            remote: RemoteSnapshot::default(),
        };
        state.save(&path).unwrap();

        assert_eq!(StateFile::load(&path).unwrap(), state);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{}").unwrap();

        let state = StateFile::load(&path).unwrap();
        assert!(state.entities.is_empty());
        assert!(state.remote.entities.is_empty());
    }

    #[test]
    fn load_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let err = StateFile::load(&path).unwrap_err();
        assert!(matches!(err, StateError::Io { .. }));

        std::fs::write(&path, "{ not json").unwrap();
        let err = StateFile::load(&path).unwrap_err();
        assert!(matches!(err, StateError::Parse { .. }));
        assert!(err.to_string().contains("state.json"));
    }
}
