use crate::engine::ExecutionState;
use crate::error::ArtifactError;
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};

/// Bumped whenever [`ExecutionState`] changes shape incompatibly.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Portable capture of a whole session, console and snapshots included.
///
/// Designers attach these to bug reports; loading one gives exactly the
/// state the reporter was looking at, without needing their project open.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionArtifact {
    pub format_version: u32,
    pub captured_at: DateTime<Utc>,
    pub state: ExecutionState,
}

impl SessionArtifact {
    pub fn capture(state: &ExecutionState) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            captured_at: Utc::now(),
            state: state.clone(),
        }
    }

    /// Saves the artifact to a file using the bincode format.
    pub fn save(&self, path: &str) -> Result<(), ArtifactError> {
        let bytes = encode_to_vec(self, standard())
            .map_err(|e| ArtifactError::EncodeError(e.to_string()))?;
        let mut file = fs::File::create(path).map_err(|e| ArtifactError::Io {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        file.write_all(&bytes).map_err(|e| ArtifactError::Io {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Loads an artifact from a file.
    pub fn from_file(path: &str) -> Result<Self, ArtifactError> {
        let mut file = fs::File::open(path).map_err(|e| ArtifactError::Io {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(|e| ArtifactError::Io {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Self::from_bytes(&bytes)
    }

    /// Deserializes an artifact from a byte slice, rejecting incompatible
    /// format versions.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArtifactError> {
        let (artifact, _) = decode_from_slice::<Self, _>(bytes, standard())
            // bincode 2 returns a tuple (data, bytes_read)
            .map_err(|e| ArtifactError::DecodeError(e.to_string()))?;
        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ArtifactError::VersionMismatch {
                found: artifact.format_version,
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }
        Ok(artifact)
    }
}
