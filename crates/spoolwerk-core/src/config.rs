// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Agent configuration.
//
// There are no command-line flags.  Everything the agent needs comes from
// the data directory: a credential file for backend access plus the device
// identity file, with fixed defaults for everything else.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpoolwerkError};

/// Name of the backend credential file inside the data directory.
pub const CREDENTIAL_FILE: &str = "backend_key.json";

/// Name of the device identity file inside the data directory.
pub const IDENTITY_FILE: &str = "config.json";

/// Backend access credentials, read from `backend_key.json`.
///
/// Unlike the identity file, a missing or corrupt credential file is fatal:
/// without backend access the agent has no job source and no presence to
/// report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendCredentials {
    /// Base URL of the queue backend.
    pub base_url: String,
    /// Bearer token for all backend requests.
    pub api_key: String,
}

impl BackendCredentials {
    /// Load credentials from the given file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SpoolwerkError::Backend(format!(
                "credential file {} unreadable: {e}",
                path.display()
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            SpoolwerkError::Backend(format!(
                "credential file {} malformed: {e}",
                path.display()
            ))
        })
    }
}

/// Resolved runtime settings for the agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub credentials: BackendCredentials,
    /// Where the identity file lives.
    pub identity_path: PathBuf,
    /// Scratch directory for downloaded payloads, partitioned by job id.
    pub scratch_dir: PathBuf,
    /// Interval between presence heartbeats.
    pub heartbeat_interval: Duration,
    /// Timeout applied to every backend and payload request.
    pub request_timeout: Duration,
}

impl AgentConfig {
    /// Assemble the configuration from the given data directory.
    pub fn from_data_dir(dir: &Path) -> Result<Self> {
        let credentials = BackendCredentials::load(&dir.join(CREDENTIAL_FILE))?;
        Ok(Self {
            credentials,
            identity_path: dir.join(IDENTITY_FILE),
            scratch_dir: dir.join("scratch"),
            heartbeat_interval: Duration::from_secs(60),
            request_timeout: Duration::from_secs(30),
        })
    }
}

/// Return the agent data directory, creating it if needed.
pub fn data_dir() -> PathBuf {
    let dir = dirs_fallback().join("spoolwerk");
    std::fs::create_dir_all(&dir).ok();
    dir
}

fn dirs_fallback() -> PathBuf {
    // Try XDG data dir, then fallback to home
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    // Last resort
    PathBuf::from("/tmp")
}
