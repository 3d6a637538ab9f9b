// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Live printer inventory.
//
// Queried fresh at heartbeat time and again at job-validation time — printer
// availability changes between any two calls, so nothing here is cached.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use spoolwerk_core::error::Result;
use spoolwerk_core::types::PrinterDescriptor;

use crate::platform::PrintSubsystem;

/// Enumerates usable printers through the platform seam.
#[derive(Clone)]
pub struct PrinterInventory {
    subsystem: Arc<dyn PrintSubsystem>,
}

impl PrinterInventory {
    pub fn new(subsystem: Arc<dyn PrintSubsystem>) -> Self {
        Self { subsystem }
    }

    /// Return every printer that is currently ready (not offline, not in
    /// error).
    ///
    /// A printer whose status query fails is excluded with a warning rather
    /// than aborting the enumeration — one bad driver must not blind the
    /// agent to the rest.  Order is OS-defined; callers must not rely on it.
    #[instrument(skip(self))]
    pub fn list_ready(&self) -> Result<Vec<PrinterDescriptor>> {
        let names = self.subsystem.printer_names()?;

        let mut ready = Vec::with_capacity(names.len());
        for name in names {
            match self.subsystem.printer_state(&name) {
                Ok(state) if state.is_ready() => {
                    ready.push(PrinterDescriptor { name, ready: true });
                }
                Ok(state) => {
                    debug!(printer = %name, ?state, "printer not ready, excluded");
                }
                Err(e) => {
                    warn!(printer = %name, error = %e, "status query failed, excluded");
                }
            }
        }

        debug!(count = ready.len(), "ready printers");
        Ok(ready)
    }

    /// Whether the named printer is in the current ready set.
    pub fn is_ready(&self, printer: &str) -> Result<bool> {
        Ok(self.list_ready()?.iter().any(|p| p.name == printer))
    }

    /// Names of all currently ready printers, for the presence record.
    pub fn ready_names(&self) -> Result<Vec<String>> {
        Ok(self.list_ready()?.into_iter().map(|p| p.name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PrinterState;
    use spoolwerk_core::error::SpoolwerkError;
    use std::path::Path;

    /// Fake subsystem with scripted per-printer states.
    struct FakeSubsystem {
        printers: Vec<(&'static str, Option<PrinterState>)>,
    }

    impl PrintSubsystem for FakeSubsystem {
        fn printer_names(&self) -> Result<Vec<String>> {
            Ok(self.printers.iter().map(|(n, _)| n.to_string()).collect())
        }

        fn printer_state(&self, name: &str) -> Result<PrinterState> {
            self.printers
                .iter()
                .find(|(n, _)| *n == name)
                .and_then(|(_, s)| *s)
                .ok_or_else(|| SpoolwerkError::PrinterQuery {
                    printer: name.to_string(),
                    detail: "driver hung".into(),
                })
        }

        fn submit(&self, _path: &Path, _printer: &str) -> Result<()> {
            Ok(())
        }
    }

    const READY: PrinterState = PrinterState {
        offline: false,
        error: false,
    };
    const OFFLINE: PrinterState = PrinterState {
        offline: true,
        error: false,
    };
    const ERRORED: PrinterState = PrinterState {
        offline: false,
        error: true,
    };

    #[test]
    fn offline_and_errored_printers_are_excluded() {
        let inventory = PrinterInventory::new(Arc::new(FakeSubsystem {
            printers: vec![
                ("LaserOne", Some(READY)),
                ("Basement", Some(OFFLINE)),
                ("Jammed", Some(ERRORED)),
            ],
        }));

        let ready = inventory.list_ready().expect("list");
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].name, "LaserOne");
        assert!(ready[0].ready);
    }

    #[test]
    fn failed_status_query_excludes_only_that_printer() {
        let inventory = PrinterInventory::new(Arc::new(FakeSubsystem {
            printers: vec![
                ("LaserOne", Some(READY)),
                ("BadDriver", None), // status query fails
                ("InkJet", Some(READY)),
            ],
        }));

        let ready = inventory.list_ready().expect("list");
        let names: Vec<_> = ready.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["LaserOne", "InkJet"]);
    }

    #[test]
    fn is_ready_checks_live_set() {
        let inventory = PrinterInventory::new(Arc::new(FakeSubsystem {
            printers: vec![("LaserOne", Some(READY)), ("Basement", Some(OFFLINE))],
        }));

        assert!(inventory.is_ready("LaserOne").expect("query"));
        assert!(!inventory.is_ready("Basement").expect("query"));
        assert!(!inventory.is_ready("Ghost").expect("query"));
    }

    #[test]
    fn enumeration_failure_propagates() {
        struct BrokenSubsystem;
        impl PrintSubsystem for BrokenSubsystem {
            fn printer_names(&self) -> Result<Vec<String>> {
                Err(SpoolwerkError::Enumeration("spooler down".into()))
            }
            fn printer_state(&self, _: &str) -> Result<PrinterState> {
                unreachable!()
            }
            fn submit(&self, _: &Path, _: &str) -> Result<()> {
                unreachable!()
            }
        }

        let inventory = PrinterInventory::new(Arc::new(BrokenSubsystem));
        assert!(inventory.list_ready().is_err());
    }
}
