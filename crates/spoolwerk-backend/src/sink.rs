// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Async seams the job pipeline is written against.
//
// The pipeline must be checkable with call-count assertions (no fetch after
// a printer-validation failure, no dispatch after a download failure), so
// the two network-touching steps sit behind traits that tests can fake.

use std::path::PathBuf;

use async_trait::async_trait;

use spoolwerk_core::error::Result;
use spoolwerk_core::types::{JobId, JobStatus};

use crate::client::BackendClient;
use crate::fetch::FileFetcher;

/// Terminal-status write-back — the single commit point per job.
#[async_trait]
pub trait JobStatusSink: Send + Sync {
    async fn record_status(&self, job_id: &JobId, status: JobStatus) -> Result<()>;
}

#[async_trait]
impl JobStatusSink for BackendClient {
    async fn record_status(&self, job_id: &JobId, status: JobStatus) -> Result<()> {
        self.update_job_status(job_id, status).await
    }
}

/// Payload retrieval into the scratch directory.
#[async_trait]
pub trait PayloadFetcher: Send + Sync {
    async fn fetch_to_scratch(&self, job_id: &JobId, url: &str) -> Result<PathBuf>;
}

#[async_trait]
impl PayloadFetcher for FileFetcher {
    async fn fetch_to_scratch(&self, job_id: &JobId, url: &str) -> Result<PathBuf> {
        FileFetcher::fetch_to_scratch(self, job_id, url).await
    }
}
