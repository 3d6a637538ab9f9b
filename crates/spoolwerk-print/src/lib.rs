// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spoolwerk Print — the seam between the agent and the OS print subsystem.
// Printer enumeration and job dispatch go through the `PrintSubsystem`
// trait so the pipeline can be exercised against fakes in tests and against
// the real spooler in production.

pub mod dispatch;
pub mod inventory;
pub mod platform;

pub use dispatch::PrintDispatcher;
pub use inventory::PrinterInventory;
pub use platform::{PrintSubsystem, PrinterState, SystemPrintSubsystem};
