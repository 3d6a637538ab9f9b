// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Spoolwerk.

use thiserror::Error;

/// Top-level error type for all Spoolwerk operations.
#[derive(Debug, Error)]
pub enum SpoolwerkError {
    // -- Identity --
    #[error("device identity error: {0}")]
    Identity(String),

    // -- Printer subsystem --
    #[error("printer enumeration failed: {0}")]
    Enumeration(String),

    #[error("printer status query failed for '{printer}': {detail}")]
    PrinterQuery { printer: String, detail: String },

    #[error("target printer not available: {0}")]
    PrinterUnavailable(String),

    #[error("print dispatch failed: {0}")]
    Dispatch(String),

    // -- Payload retrieval --
    #[error("payload download failed: {0}")]
    Download(String),

    // -- Backend --
    #[error("backend request failed: {0}")]
    Backend(String),

    #[error("job subscription error: {0}")]
    Subscription(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SpoolwerkError>;
