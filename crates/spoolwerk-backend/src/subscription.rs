// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Live job subscription.
//
// A spawned task owns the watch stream and pushes decoded job-added events
// into an mpsc channel; the agent's worker loop consumes the other end.
// This decouples delivery concurrency from processing concurrency: a slow
// job handler exerts backpressure on the channel instead of blocking the
// stream reader, and a dropped receiver shuts the task down.
//
// Delivery is at-least-once across reconnects.  That is safe because
// consumption is signalled by the status transition away from `pendente`:
// once a job's write-back lands, the backend filter stops re-delivering it.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use spoolwerk_core::types::{JobStatus, PrintJob};

use crate::client::BackendClient;

/// Base delay before reconnecting a failed watch stream.
const RECONNECT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Cap on the reconnect delay.
const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(60);

/// Handle to the background subscription task.
pub struct JobSubscription {
    handle: JoinHandle<()>,
}

impl JobSubscription {
    /// Start the subscription for jobs addressed to `device_id`.
    ///
    /// Runs for the process lifetime (or until the receiver side of `tx` is
    /// dropped), reconnecting with capped backoff whenever the stream ends
    /// or errors.
    pub fn spawn(client: BackendClient, device_id: String, tx: mpsc::Sender<PrintJob>) -> Self {
        let handle = tokio::spawn(async move {
            let mut delay = RECONNECT_BASE_DELAY;

            loop {
                match run_stream(&client, &device_id, &tx).await {
                    StreamEnd::ReceiverDropped => {
                        info!("job channel closed, subscription stopping");
                        return;
                    }
                    StreamEnd::Disconnected(reason) => {
                        warn!(%reason, delay_ms = delay.as_millis() as u64, "watch stream lost, reconnecting");
                        tokio::time::sleep(delay).await;
                        delay = (delay * 2).min(RECONNECT_MAX_DELAY);
                    }
                    StreamEnd::Delivered => {
                        // Stream closed normally after delivering events;
                        // reconnect promptly.
                        delay = RECONNECT_BASE_DELAY;
                    }
                }
            }
        });
        Self { handle }
    }

    pub fn abort(&self) {
        self.handle.abort();
    }
}

enum StreamEnd {
    /// The consumer went away; stop for good.
    ReceiverDropped,
    /// Transport failure or error response; back off before reconnecting.
    Disconnected(String),
    /// Server closed a healthy stream; reconnect without backoff.
    Delivered,
}

/// Drain one watch connection until it ends.
async fn run_stream(
    client: &BackendClient,
    device_id: &str,
    tx: &mpsc::Sender<PrintJob>,
) -> StreamEnd {
    let resp = match client.watch_jobs(device_id).await {
        Ok(resp) => resp,
        Err(e) => return StreamEnd::Disconnected(e.to_string()),
    };

    info!(device_id, "subscribed to pending jobs");

    let mut delivered_any = false;
    let mut buffer = Vec::new();
    let mut body = resp.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => return StreamEnd::Disconnected(format!("stream read: {e}")),
        };
        buffer.extend_from_slice(&chunk);

        // One JSON record per line; a chunk may hold several lines or a
        // partial one.
        while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]).into_owned();

            let Some(job) = decode_event(&line) else {
                continue;
            };
            if !matches_filter(&job, device_id) {
                debug!(job_id = %job.job_id, "event did not match filter, ignored");
                continue;
            }

            info!(job_id = %job.job_id, printer = %job.target_printer, "job received");
            delivered_any = true;
            if tx.send(job).await.is_err() {
                return StreamEnd::ReceiverDropped;
            }
        }
    }

    if delivered_any {
        StreamEnd::Delivered
    } else {
        StreamEnd::Disconnected("stream closed by server".into())
    }
}

/// Decode one watch line into a job record.  Blank lines (keep-alives) and
/// malformed records are skipped with a warning rather than killing the
/// stream.
pub fn decode_event(line: &str) -> Option<PrintJob> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str(trimmed) {
        Ok(job) => Some(job),
        Err(e) => {
            warn!(error = %e, "undecodable watch event skipped");
            None
        }
    }
}

/// Defensive re-check of the server-side filter.  The backend already
/// filters on device id and status, but a job printed on the wrong desk is
/// a physical misprint, so the agent verifies before acting.
pub fn matches_filter(job: &PrintJob, device_id: &str) -> bool {
    job.target_device_id == device_id && job.status == JobStatus::Pending
}
