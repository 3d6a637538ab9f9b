// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Spoolwerk print relay agent.
//
// The backend wire format predates this implementation and uses Portuguese
// field names (`pc_id`, `impressora_alvo`, ...).  Rust-side names stay
// English; serde renames keep the records byte-compatible with what the
// backend and the web frontend already exchange.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Owner-binding sentinel for a device nobody has claimed yet.
pub const OWNER_UNBOUND: &str = "nao_vinculado";

/// Unique identifier for a remote print job, assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Durable identity of the workstation this agent runs on.
///
/// Created once on first run and persisted to a local file; the id survives
/// hostname changes and OS reinstalls that keep the file around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Opaque unique id, immutable for the life of the installation.
    #[serde(rename = "pc_id")]
    pub device_id: String,
    /// Human-editable label; defaults to the host machine name.
    #[serde(rename = "nome_amigavel")]
    pub display_name: String,
    /// Owner account binding; `OWNER_UNBOUND` until claimed.
    #[serde(rename = "medico_dono_email")]
    pub owner_email: String,
}

impl DeviceIdentity {
    /// Synthesize a fresh identity for a host that has none.
    pub fn generate(host_name: &str) -> Self {
        Self {
            device_id: Uuid::new_v4().to_string(),
            display_name: host_name.to_string(),
            owner_email: OWNER_UNBOUND.to_string(),
        }
    }
}

/// A printer as seen by the OS print subsystem at one instant.
///
/// `ready` is derived at query time and must never be cached across
/// heartbeats — availability can change between any two calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterDescriptor {
    pub name: String,
    pub ready: bool,
}

/// Lifecycle states of a remote print job.
///
/// Everything except `Pending` is terminal; moving a job out of `Pending`
/// is the signal that consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Waiting to be picked up by the target device.
    #[serde(rename = "pendente")]
    Pending,
    /// Spool request accepted by the local driver.
    #[serde(rename = "impresso")]
    Printed,
    /// Target printer was not in the ready set at validation time.
    #[serde(rename = "erro_impressora_inexistente")]
    PrinterNotFound,
    /// Transport failure or non-success response fetching the payload.
    #[serde(rename = "erro_download")]
    DownloadFailed,
    /// OS print submission was rejected.
    #[serde(rename = "erro_driver")]
    DriverFailed,
}

impl JobStatus {
    /// Whether this status consumes the job.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A print job record as stored in the remote queue.
///
/// The agent never creates or deletes these; it observes them via the
/// subscription and mutates exactly one field (`status`) exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintJob {
    #[serde(rename = "id")]
    pub job_id: JobId,
    /// Must equal this agent's device id for the job to be eligible.
    #[serde(rename = "pc_alvo_id")]
    pub target_device_id: String,
    /// Must match a currently ready printer for the job to proceed.
    #[serde(rename = "impressora_alvo")]
    pub target_printer: String,
    /// Location of the payload bytes.
    #[serde(rename = "url_arquivo")]
    pub source_url: String,
    pub status: JobStatus,
}

/// Presence record merge-written to the backend on startup and every
/// heartbeat tick.  No history is retained; each write overwrites the last.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicePresence {
    #[serde(rename = "nome")]
    pub name: String,
    /// Names of printers currently ready on this device.
    #[serde(rename = "impressoras")]
    pub printers: Vec<String>,
    pub status: String,
    #[serde(rename = "ultimo_visto")]
    pub last_seen: DateTime<Utc>,
}

impl DevicePresence {
    /// Build an "online" presence snapshot from a fresh printer inventory.
    pub fn online(name: &str, printers: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            printers,
            status: "online".to_string(),
            last_seen: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_wire_names_match_backend_contract() {
        let identity = DeviceIdentity {
            device_id: "abc-123".into(),
            display_name: "CONSULTORIO-01".into(),
            owner_email: OWNER_UNBOUND.into(),
        };
        let json = serde_json::to_value(&identity).expect("serialize");
        assert_eq!(json["pc_id"], "abc-123");
        assert_eq!(json["nome_amigavel"], "CONSULTORIO-01");
        assert_eq!(json["medico_dono_email"], "nao_vinculado");
    }

    #[test]
    fn generated_identity_is_unbound_and_unique() {
        let a = DeviceIdentity::generate("host-a");
        let b = DeviceIdentity::generate("host-a");
        assert_ne!(a.device_id, b.device_id);
        assert_eq!(a.display_name, "host-a");
        assert_eq!(a.owner_email, OWNER_UNBOUND);
        assert!(Uuid::parse_str(&a.device_id).is_ok());
    }

    #[test]
    fn job_status_wire_values() {
        for (status, wire) in [
            (JobStatus::Pending, "\"pendente\""),
            (JobStatus::Printed, "\"impresso\""),
            (JobStatus::PrinterNotFound, "\"erro_impressora_inexistente\""),
            (JobStatus::DownloadFailed, "\"erro_download\""),
            (JobStatus::DriverFailed, "\"erro_driver\""),
        ] {
            assert_eq!(serde_json::to_string(&status).expect("serialize"), wire);
        }
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!JobStatus::Pending.is_terminal());
        for status in [
            JobStatus::Printed,
            JobStatus::PrinterNotFound,
            JobStatus::DownloadFailed,
            JobStatus::DriverFailed,
        ] {
            assert!(status.is_terminal());
        }
    }

    #[test]
    fn job_record_parses_from_backend_json() {
        let raw = r#"{
            "id": "job-42",
            "pc_alvo_id": "dev-7",
            "impressora_alvo": "LaserOne",
            "url_arquivo": "https://files.example/receita.pdf",
            "status": "pendente"
        }"#;
        let job: PrintJob = serde_json::from_str(raw).expect("parse");
        assert_eq!(job.job_id, JobId::from("job-42"));
        assert_eq!(job.target_device_id, "dev-7");
        assert_eq!(job.target_printer, "LaserOne");
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[test]
    fn presence_snapshot_reports_online() {
        let presence = DevicePresence::online("front-desk", vec!["LaserOne".into()]);
        let json = serde_json::to_value(&presence).expect("serialize");
        assert_eq!(json["status"], "online");
        assert_eq!(json["nome"], "front-desk");
        assert_eq!(json["impressoras"][0], "LaserOne");
        assert!(json["ultimo_visto"].is_string());
    }
}
