// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spoolwerk — unattended cloud-to-printer relay agent.
//
// Entry point. Initialises logging, resolves configuration from the data
// directory (no command-line flags), and hands off to the orchestrator.
// Startup failures are fatal; everything after startup is designed to run
// forever.

mod agent;
mod identity;
mod pipeline;

use tracing::{error, info};

use agent::Agent;
use spoolwerk_core::config::{self, AgentConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Spoolwerk agent starting");

    let data_dir = config::data_dir();
    let config = match AgentConfig::from_data_dir(&data_dir) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, dir = %data_dir.display(), "configuration unavailable");
            std::process::exit(1);
        }
    };

    let agent = match Agent::bootstrap(config).await {
        Ok(agent) => agent,
        Err(e) => {
            error!(error = %e, "startup failed — cannot continue without the backend");
            std::process::exit(1);
        }
    };

    if let Err(e) = agent.run().await {
        error!(error = %e, "agent stopped");
        std::process::exit(1);
    }
}
