// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print dispatch.
//
// Hands a fetched file to the OS spooler for a named printer.  Success is a
// best-effort signal: the spool request was accepted, nothing more.  Any
// failure is converted into `SpoolwerkError::Dispatch` at this boundary; the
// caller decides the resulting job status.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use spoolwerk_core::error::Result;

use crate::platform::PrintSubsystem;

#[derive(Clone)]
pub struct PrintDispatcher {
    subsystem: Arc<dyn PrintSubsystem>,
}

impl PrintDispatcher {
    pub fn new(subsystem: Arc<dyn PrintSubsystem>) -> Self {
        Self { subsystem }
    }

    /// Submit the file at `path` to the named printer.
    #[instrument(skip(self), fields(file = %path.display()))]
    pub fn print(&self, path: &Path, printer: &str) -> Result<()> {
        match self.subsystem.submit(path, printer) {
            Ok(()) => {
                info!(printer, "print job handed to spooler");
                Ok(())
            }
            Err(e) => {
                warn!(printer, error = %e, "print dispatch failed");
                Err(e)
            }
        }
    }
}
