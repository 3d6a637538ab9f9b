// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Payload fetcher.
//
// Downloads job payload bytes from the remote file host and persists them to
// the scratch directory under a job-id-derived name.  Job-id partitioning is
// what lets concurrently handled jobs share the directory without locking.
// The body is fully buffered before anything touches disk, so a failed
// download never leaves a partially written scratch file.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info, instrument};

use spoolwerk_core::error::{Result, SpoolwerkError};
use spoolwerk_core::types::JobId;

/// Extension used when neither the content type nor the URL gives one away.
const DEFAULT_EXTENSION: &str = "pdf";

pub struct FileFetcher {
    http: Client,
    scratch_dir: PathBuf,
}

impl FileFetcher {
    pub fn new(scratch_dir: PathBuf, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SpoolwerkError::Download(format!("client build: {e}")))?;
        Ok(Self { http, scratch_dir })
    }

    /// Download `url` and persist it as `{scratch}/{job_id}.{ext}`.
    ///
    /// Transport failures and non-success responses become
    /// `SpoolwerkError::Download`.  An existing file of the same name (a
    /// retried job) is removed first so the write is idempotent.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn fetch_to_scratch(&self, job_id: &JobId, url: &str) -> Result<PathBuf> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| SpoolwerkError::Download(format!("GET {url}: {e}")))?;

        if !resp.status().is_success() {
            return Err(SpoolwerkError::Download(format!(
                "GET {url} returned {}",
                resp.status()
            )));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| SpoolwerkError::Download(format!("body read: {e}")))?;

        let ext = resolve_extension(content_type.as_deref(), url);
        debug!(size = bytes.len(), ext, "payload downloaded");

        self.persist(job_id, ext, &bytes).await
    }

    /// Write payload bytes to the scratch directory, replacing any previous
    /// file for the same job.
    pub async fn persist(&self, job_id: &JobId, ext: &str, bytes: &[u8]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.scratch_dir).await?;

        let path = self.scratch_dir.join(format!("{job_id}.{ext}"));
        if tokio::fs::try_exists(&path).await? {
            tokio::fs::remove_file(&path).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        info!(file = %path.display(), "payload persisted to scratch");
        Ok(path)
    }
}

/// Resolve the file extension for a payload.
///
/// Content type wins; failing that the URL is scanned for a known suffix
/// (`.pdf`, `.png`, `.jpg` — in that priority); failing that, `.pdf`.  A
/// `jpe` result (registry-style MIME tables map `image/jpeg` there) is
/// normalized to `jpg` so the OS handler association always resolves.
pub fn resolve_extension(content_type: Option<&str>, url: &str) -> &'static str {
    let ext = content_type
        .and_then(ext_from_content_type)
        .or_else(|| ext_from_url(url))
        .unwrap_or(DEFAULT_EXTENSION);

    if ext == "jpe" { "jpg" } else { ext }
}

fn ext_from_content_type(value: &str) -> Option<&'static str> {
    let mime = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match mime.as_str() {
        "application/pdf" => Some("pdf"),
        "image/png" => Some("png"),
        "image/jpeg" | "image/pjpeg" => Some("jpe"),
        _ => None,
    }
}

fn ext_from_url(url: &str) -> Option<&'static str> {
    let lower = url.to_ascii_lowercase();
    [("pdf", ".pdf"), ("png", ".png"), ("jpg", ".jpg")]
        .into_iter()
        .find(|(_, suffix)| lower.contains(suffix))
        .map(|(ext, _)| ext)
}
