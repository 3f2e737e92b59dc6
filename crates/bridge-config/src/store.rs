// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted `{config, session}` document in the user-data directory.
//!
//! All writes are full-file rewrites. A missing or unparseable file yields
//! defaults so a corrupted document can never wedge startup.

use std::path::{Path, PathBuf};

use tracing::warn;

use bridge_core::BridgeError;

use crate::model::{AgentConfig, PersistedState};

/// File name of the state document.
pub const STATE_FILE: &str = "desktop-print-worker.json";

/// Loads and rewrites the persisted bridge state.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Store rooted in the given user-data directory.
    pub fn new(user_data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: user_data_dir.as_ref().join(STATE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document; missing or unparseable content yields defaults.
    /// The loaded config is re-sanitized so hand-edited files cannot smuggle
    /// invalid values in.
    pub async fn load(&self) -> PersistedState {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(_) => return PersistedState::default(),
        };
        let mut state: PersistedState = match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "state file unparseable, using defaults");
                return PersistedState::default();
            }
        };
        state.config = Some(state.config.unwrap_or_default().sanitized());
        state
    }

    /// Convenience: the effective agent config from disk.
    pub async fn load_config(&self) -> AgentConfig {
        self.load().await.config.unwrap_or_default()
    }

    /// Rewrite the whole document.
    pub async fn save(&self, state: &PersistedState) -> Result<(), BridgeError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BridgeError::Config(format!(
                    "cannot create state directory {}: {e}",
                    parent.display()
                )))?;
        }
        let body = serde_json::to_string_pretty(state)
            .map_err(|e| BridgeError::Internal(format!("state serialization failed: {e}")))?;
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|e| BridgeError::Config(format!(
                "cannot write state file {}: {e}",
                self.path.display()
            )))?;
        Ok(())
    }
}
