// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic print subsystem trait plus the real OS-backed
// implementation.
//
// The agent only ever needs three things from the host: the set of installed
// printers (local and network-connected), the live state of one printer, and
// a best-effort "print this file on this named printer" action.  Everything
// else (format handling, driver selection, spool management) is owned by the
// OS.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use spoolwerk_core::error::{Result, SpoolwerkError};

/// Live state of a single printer as reported by the OS at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrinterState {
    pub offline: bool,
    pub error: bool,
}

impl PrinterState {
    /// A printer is usable when it is neither offline nor in error.
    pub fn is_ready(&self) -> bool {
        !self.offline && !self.error
    }
}

/// Access to the host's print subsystem.
///
/// `printer_state` is separate from `printer_names` so that one printer's
/// broken driver can fail its own status query without blinding the agent
/// to every other printer.
pub trait PrintSubsystem: Send + Sync {
    /// Enumerate every printer visible to the OS.  Order is OS-defined.
    fn printer_names(&self) -> Result<Vec<String>>;

    /// Query the live state of one printer.  May fail per printer.
    fn printer_state(&self, name: &str) -> Result<PrinterState>;

    /// Submit a file to the named printer via the OS default handler for
    /// the file's type.  Success means the spool request was accepted, not
    /// that physical output occurred.
    fn submit(&self, path: &Path, printer: &str) -> Result<()>;
}

/// The real OS spooler, driven through the platform's print tools.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPrintSubsystem;

impl SystemPrintSubsystem {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
impl PrintSubsystem for SystemPrintSubsystem {
    fn printer_names(&self) -> Result<Vec<String>> {
        let output = Command::new("lpstat")
            .args(["-p"])
            .output()
            .map_err(|e| SpoolwerkError::Enumeration(format!("lpstat -p: {e}")))?;
        if !output.status.success() {
            return Err(SpoolwerkError::Enumeration(format!(
                "lpstat -p exited with {}",
                output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let names = stdout
            .lines()
            .filter_map(|line| line.strip_prefix("printer "))
            .filter_map(|rest| rest.split_whitespace().next())
            .map(str::to_string)
            .collect::<Vec<_>>();
        debug!(count = names.len(), "enumerated printers via lpstat");
        Ok(names)
    }

    fn printer_state(&self, name: &str) -> Result<PrinterState> {
        let output = Command::new("lpstat")
            .args(["-p", name])
            .output()
            .map_err(|e| SpoolwerkError::PrinterQuery {
                printer: name.to_string(),
                detail: format!("lpstat -p {name}: {e}"),
            })?;
        if !output.status.success() {
            return Err(SpoolwerkError::PrinterQuery {
                printer: name.to_string(),
                detail: format!("lpstat -p {name} exited with {}", output.status),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_ascii_lowercase();
        Ok(PrinterState {
            // CUPS reports unreachable queues as disabled with an
            // "unable to connect" reason.
            offline: stdout.contains("unable to connect") || stdout.contains("offline"),
            error: stdout.contains("disabled") || stdout.contains("stopped"),
        })
    }

    fn submit(&self, path: &Path, printer: &str) -> Result<()> {
        let output = Command::new("lp")
            .arg("-d")
            .arg(printer)
            .arg(path)
            .output()
            .map_err(|e| SpoolwerkError::Dispatch(format!("lp -d {printer}: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpoolwerkError::Dispatch(format!(
                "lp -d {printer} rejected the job: {}",
                stderr.trim()
            )));
        }
        debug!(printer, file = %path.display(), "spool request accepted");
        Ok(())
    }
}

#[cfg(windows)]
impl PrintSubsystem for SystemPrintSubsystem {
    fn printer_names(&self) -> Result<Vec<String>> {
        let output = Command::new("powershell")
            .args([
                "-NoProfile",
                "-Command",
                "Get-Printer | Select-Object -ExpandProperty Name",
            ])
            .output()
            .map_err(|e| SpoolwerkError::Enumeration(format!("Get-Printer: {e}")))?;
        if !output.status.success() {
            return Err(SpoolwerkError::Enumeration(format!(
                "Get-Printer exited with {}",
                output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let names = stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        debug!(count = names.len(), "enumerated printers via Get-Printer");
        Ok(names)
    }

    fn printer_state(&self, name: &str) -> Result<PrinterState> {
        let script = format!(
            "(Get-Printer -Name '{}').PrinterStatus",
            name.replace('\'', "''")
        );
        let output = Command::new("powershell")
            .args(["-NoProfile", "-Command", &script])
            .output()
            .map_err(|e| SpoolwerkError::PrinterQuery {
                printer: name.to_string(),
                detail: format!("Get-Printer status: {e}"),
            })?;
        if !output.status.success() {
            return Err(SpoolwerkError::PrinterQuery {
                printer: name.to_string(),
                detail: format!("Get-Printer status exited with {}", output.status),
            });
        }

        let status = String::from_utf8_lossy(&output.stdout)
            .trim()
            .to_ascii_lowercase();
        Ok(PrinterState {
            offline: status.contains("offline"),
            error: status.contains("error"),
        })
    }

    fn submit(&self, path: &Path, printer: &str) -> Result<()> {
        // The "printto" shell verb is the same mechanism Explorer uses for
        // right-click printing to a specific device.
        let script = format!(
            "Start-Process -FilePath '{}' -Verb PrintTo -ArgumentList '\"{}\"'",
            path.display().to_string().replace('\'', "''"),
            printer.replace('\'', "''")
        );
        let output = Command::new("powershell")
            .args(["-NoProfile", "-Command", &script])
            .output()
            .map_err(|e| SpoolwerkError::Dispatch(format!("printto {printer}: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpoolwerkError::Dispatch(format!(
                "printto {printer} rejected the job: {}",
                stderr.trim()
            )));
        }
        debug!(printer, file = %path.display(), "spool request accepted");
        Ok(())
    }
}
