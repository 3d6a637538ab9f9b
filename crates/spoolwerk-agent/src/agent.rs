// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Agent orchestrator.
//
// Wires identity, inventory, subscription, and heartbeat together and runs
// forever: Starting → Announcing → Listening, then alternating Heartbeating
// and Handling.  Job handling runs in spawned tasks so one job's write-back
// never delays the heartbeat or the delivery of the next job; the per-job
// steps stay sequential inside `pipeline::process_job`.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use spoolwerk_backend::{BackendClient, FileFetcher, JobSubscription};
use spoolwerk_core::config::AgentConfig;
use spoolwerk_core::error::{Result, SpoolwerkError};
use spoolwerk_core::types::{DeviceIdentity, DevicePresence};
use spoolwerk_print::{PrintDispatcher, PrinterInventory, SystemPrintSubsystem};

use crate::identity::IdentityStore;
use crate::pipeline;

/// Buffered job-added events between the subscription and the worker loop.
const JOB_CHANNEL_CAPACITY: usize = 32;

pub struct Agent {
    config: AgentConfig,
    client: BackendClient,
    identity: DeviceIdentity,
    inventory: PrinterInventory,
    dispatcher: PrintDispatcher,
    fetcher: Arc<FileFetcher>,
}

impl Agent {
    /// Establish identity and backend connectivity.  Any failure here is
    /// fatal: there is no degraded/offline mode.
    pub async fn bootstrap(config: AgentConfig) -> Result<Self> {
        let client = BackendClient::new(&config.credentials, config.request_timeout)?;
        client.ping().await?;

        let identity = IdentityStore::new(config.identity_path.clone()).load_or_create()?;

        let subsystem = Arc::new(SystemPrintSubsystem::new());
        let inventory = PrinterInventory::new(subsystem.clone());
        let dispatcher = PrintDispatcher::new(subsystem);
        let fetcher = Arc::new(FileFetcher::new(
            config.scratch_dir.clone(),
            config.request_timeout,
        )?);

        tokio::fs::create_dir_all(&config.scratch_dir).await?;

        Ok(Self {
            config,
            client,
            identity,
            inventory,
            dispatcher,
            fetcher,
        })
    }

    /// Announce presence, start the subscription, and run the heartbeat and
    /// worker loops for the process lifetime.
    #[instrument(skip(self), fields(device_id = %self.identity.device_id))]
    pub async fn run(self) -> Result<()> {
        // Announcing: the startup publish carries the full identity and
        // inventory; failure here is fatal, unlike later ticks.
        self.publish_presence().await?;
        info!(name = %self.identity.display_name, "presence announced, awaiting jobs");

        let (tx, mut rx) = mpsc::channel(JOB_CHANNEL_CAPACITY);
        let _subscription = JobSubscription::spawn(
            self.client.clone(),
            self.identity.device_id.clone(),
            tx,
        );

        let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval);
        // interval fires immediately; the startup announce already covered it.
        heartbeat.tick().await;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    // A missed heartbeat only leaves the backend's view
                    // stale; the next tick repairs it.
                    if let Err(e) = self.publish_presence().await {
                        warn!(error = %e, "heartbeat publish failed");
                    }
                }
                maybe_job = rx.recv() => {
                    let Some(job) = maybe_job else {
                        return Err(SpoolwerkError::Subscription(
                            "job subscription terminated".into(),
                        ));
                    };
                    tokio::spawn(pipeline::process_job(
                        job,
                        self.inventory.clone(),
                        self.fetcher.clone(),
                        self.dispatcher.clone(),
                        Arc::new(self.client.clone()),
                    ));
                }
            }
        }
    }

    /// Merge-upsert the online record with a fresh inventory and timestamp.
    /// The inventory is always queried live; nothing is cached across ticks.
    async fn publish_presence(&self) -> Result<()> {
        let inventory = self.inventory.clone();
        let printers = tokio::task::spawn_blocking(move || inventory.ready_names())
            .await
            .map_err(|e| SpoolwerkError::Enumeration(format!("inventory task: {e}")))??;

        let presence = DevicePresence::online(&self.identity.display_name, printers);
        self.client
            .publish_presence(&self.identity.device_id, &presence)
            .await
    }
}
