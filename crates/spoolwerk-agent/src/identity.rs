// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Durable device identity.
//
// The id is what the backend keys everything on, so it must survive hostname
// changes: generated once on first run, persisted next to the credential
// file, returned unchanged forever after.  A corrupt or incomplete file is
// treated as absent — one controlled identity loss, observable in the log,
// never a crash.

use std::path::PathBuf;

use tracing::{info, warn};

use spoolwerk_core::error::Result;
use spoolwerk_core::types::DeviceIdentity;

pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Return the persisted identity, creating and persisting a fresh one
    /// if no valid record exists.  Idempotent across restarts.
    pub fn load_or_create(&self) -> Result<DeviceIdentity> {
        if let Some(identity) = self.try_load() {
            info!(device_id = %identity.device_id, name = %identity.display_name, "identity loaded");
            return Ok(identity);
        }

        let identity = DeviceIdentity::generate(&host_name());
        self.persist(&identity)?;
        info!(device_id = %identity.device_id, name = %identity.display_name, "new identity created");
        Ok(identity)
    }

    fn try_load(&self) -> Option<DeviceIdentity> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<DeviceIdentity>(&raw) {
            Ok(identity) if !identity.device_id.is_empty() => Some(identity),
            Ok(_) => {
                warn!(path = %self.path.display(), "identity file has empty pc_id, regenerating");
                None
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "identity file corrupt, regenerating");
                None
            }
        }
    }

    fn persist(&self, identity: &DeviceIdentity) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(identity)?)?;
        Ok(())
    }
}

fn host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "spoolwerk-device".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spoolwerk_core::types::OWNER_UNBOUND;
    use uuid::Uuid;

    fn store_in(dir: &tempfile::TempDir) -> IdentityStore {
        IdentityStore::new(dir.path().join("config.json"))
    }

    #[test]
    fn missing_file_creates_valid_identity_and_persists_it() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);

        let first = store.load_or_create().expect("create");
        assert!(Uuid::parse_str(&first.device_id).is_ok());
        assert_eq!(first.owner_email, OWNER_UNBOUND);
        assert!(!first.display_name.is_empty());

        // The next call must return the persisted record unchanged.
        let second = store.load_or_create().expect("reload");
        assert_eq!(first, second);
    }

    #[test]
    fn valid_file_is_returned_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"pc_id": "keep-me", "nome_amigavel": "FRONT-DESK", "medico_dono_email": "dr@example.com"}"#,
        )
        .expect("seed file");

        let identity = store_in(&dir).load_or_create().expect("load");
        assert_eq!(identity.device_id, "keep-me");
        assert_eq!(identity.display_name, "FRONT-DESK");
        assert_eq!(identity.owner_email, "dr@example.com");
    }

    #[test]
    fn corrupt_file_is_regenerated_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("config.json"), "{garbage").expect("seed file");

        let store = store_in(&dir);
        let regenerated = store.load_or_create().expect("regenerate");
        assert!(Uuid::parse_str(&regenerated.device_id).is_ok());

        // Regeneration persisted: subsequent calls are stable again.
        assert_eq!(regenerated, store.load_or_create().expect("reload"));
    }

    #[test]
    fn missing_identity_field_is_treated_as_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"nome_amigavel": "NO-ID-HERE"}"#,
        )
        .expect("seed file");

        let identity = store_in(&dir).load_or_create().expect("regenerate");
        assert!(Uuid::parse_str(&identity.device_id).is_ok());
        assert_ne!(identity.display_name, "NO-ID-HERE");
    }
}
