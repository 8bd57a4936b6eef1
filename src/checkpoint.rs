use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::EngineState;
use crate::error::{Error, Result};
use crate::util::{now_utc_string, read_to_string, sha256_hex, write_json_pretty};

pub const CHECKPOINT_MANIFEST_VERSION: u32 = 1;

/// On-disk checkpoint: the engine state plus a digest of its compact JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointFile {
    pub manifest_version: u32,
    pub saved_at: String,
    pub state_sha256: String,
    pub state: EngineState,
}

impl CheckpointFile {
    pub fn new(state: EngineState) -> Result<Self> {
        let state_sha256 = state_digest(&state)?;
        Ok(Self {
            manifest_version: CHECKPOINT_MANIFEST_VERSION,
            saved_at: now_utc_string(),
            state_sha256,
            state,
        })
    }

    /// Checks the manifest version, the digest and the state's own structure.
    pub fn verify(&self) -> Result<()> {
        if self.manifest_version != CHECKPOINT_MANIFEST_VERSION {
            return Err(Error::invalid_input(format!(
                "unsupported checkpoint manifest version {}",
                self.manifest_version
            )));
        }

        let actual = state_digest(&self.state)?;
        if actual != self.state_sha256 {
            return Err(Error::invalid_input(format!(
                "checkpoint checksum mismatch: recorded {}, computed {actual}",
                self.state_sha256
            )));
        }

        self.state.validate()
    }
}

fn state_digest(state: &EngineState) -> Result<String> {
    let compact = serde_json::to_vec(state)
        .map_err(|err| Error::json("serialize engine state for checksum", err))?;
    Ok(sha256_hex(&compact))
}

pub fn save_checkpoint(path: &Path, state: &EngineState) -> Result<()> {
    let checkpoint = CheckpointFile::new(state.clone())?;
    write_json_pretty(path, &checkpoint)?;
    info!(
        path = %path.display(),
        target_schema = %state.target_schema,
        processed = state.processed_count,
        "wrote checkpoint"
    );
    Ok(())
}

pub fn load_checkpoint(path: &Path) -> Result<EngineState> {
    let raw = read_to_string(path)?;
    let checkpoint = serde_json::from_str::<CheckpointFile>(&raw).map_err(|err| {
        Error::invalid_input(format!("malformed checkpoint {}: {err}", path.display()))
    })?;
    checkpoint.verify()?;

    info!(
        path = %path.display(),
        saved_at = %checkpoint.saved_at,
        processed = checkpoint.state.processed_count,
        "loaded checkpoint"
    );
    Ok(checkpoint.state)
}
