// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP client for the queue backend.
//
// An explicitly constructed handle, built once at startup and passed to
// every component that needs backend access.  Presence records live under
// `dispositivos_online/{device_id}` and job records under
// `fila_impressao/{job_id}`; both are PATCHed with merge semantics so the
// agent never clobbers fields owned by other writers (owner binding on the
// device record in particular).

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use spoolwerk_core::config::BackendCredentials;
use spoolwerk_core::error::{Result, SpoolwerkError};
use spoolwerk_core::types::{DevicePresence, JobId, JobStatus};

/// Maximum attempts for a backend write before giving up.
const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Base delay between write retries, doubled per attempt.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Cap on the per-attempt retry delay.
const RETRY_MAX_DELAY: Duration = Duration::from_secs(5);

/// Per-request timeout for the watch stream.  The subscription reconnects
/// when it expires, so this only bounds how long a silent connection is
/// held open.
const WATCH_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl BackendClient {
    /// Build a client with a bounded per-request timeout.
    pub fn new(credentials: &BackendCredentials, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SpoolwerkError::Backend(format!("client build: {e}")))?;
        Ok(Self {
            http,
            base_url: credentials.base_url.trim_end_matches('/').to_string(),
            api_key: credentials.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Startup health check.  Failure here is fatal to the agent: without
    /// backend access there is no job source and no presence to report.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<()> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| SpoolwerkError::Backend(format!("health check: {e}")))?;

        if resp.status().is_success() {
            info!("backend reachable");
            Ok(())
        } else {
            Err(SpoolwerkError::Backend(format!(
                "health check returned {}",
                resp.status()
            )))
        }
    }

    /// Merge-upsert the device presence record.  Fields not present in the
    /// body are left untouched on the backend.
    #[instrument(skip(self, presence), fields(device_id = %device_id))]
    pub async fn publish_presence(
        &self,
        device_id: &str,
        presence: &DevicePresence,
    ) -> Result<()> {
        let url = format!("{}/dispositivos_online/{device_id}", self.base_url);
        self.patch_with_retry(&url, presence).await?;
        debug!(printers = presence.printers.len(), "presence published");
        Ok(())
    }

    /// Write a job's terminal status.  This is the single commit point that
    /// consumes the job; it is never called twice for the same job by this
    /// agent.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn update_job_status(&self, job_id: &JobId, status: JobStatus) -> Result<()> {
        let url = format!("{}/fila_impressao/{job_id}", self.base_url);
        self.patch_with_retry(&url, &serde_json::json!({ "status": status }))
            .await?;
        info!(job_id = %job_id, ?status, "job status written");
        Ok(())
    }

    /// Open the filtered change stream for jobs addressed to this device
    /// with status `pendente`.  The response body is newline-delimited JSON,
    /// one job record per line, emitted when a record newly matches the
    /// filter.
    #[instrument(skip(self))]
    pub async fn watch_jobs(&self, device_id: &str) -> Result<reqwest::Response> {
        let resp = self
            .http
            .get(format!("{}/fila_impressao/watch", self.base_url))
            .query(&[("pc_alvo_id", device_id), ("status", "pendente")])
            .bearer_auth(&self.api_key)
            // The watch response is a long-lived stream; the client-level
            // timeout would kill it between events.
            .timeout(WATCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| SpoolwerkError::Subscription(format!("watch open: {e}")))?;

        if !resp.status().is_success() {
            return Err(SpoolwerkError::Subscription(format!(
                "watch returned {}",
                resp.status()
            )));
        }
        debug!("job watch stream open");
        Ok(resp)
    }

    /// PATCH with bounded retry: transport errors and 5xx responses are
    /// retried with doubling, capped backoff; 4xx responses fail fast.
    async fn patch_with_retry<B: Serialize>(&self, url: &str, body: &B) -> Result<()> {
        let mut delay = RETRY_BASE_DELAY;

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            match self.patch_once(url, body).await {
                Ok(()) => return Ok(()),
                Err(RetryableError::Fatal(e)) => return Err(e),
                Err(RetryableError::Transient(e)) => {
                    if attempt == MAX_WRITE_ATTEMPTS {
                        return Err(e);
                    }
                    warn!(attempt, error = %e, "backend write failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(RETRY_MAX_DELAY);
                }
            }
        }
        unreachable!("loop returns on final attempt")
    }

    async fn patch_once<B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> std::result::Result<(), RetryableError> {
        let resp = self
            .http
            .patch(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                RetryableError::Transient(SpoolwerkError::Backend(format!("PATCH {url}: {e}")))
            })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let err = SpoolwerkError::Backend(format!("PATCH {url} returned {status}"));
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            Err(RetryableError::Transient(err))
        } else {
            Err(RetryableError::Fatal(err))
        }
    }
}

enum RetryableError {
    Transient(SpoolwerkError),
    Fatal(SpoolwerkError),
}
