// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spoolwerk Backend — everything that crosses the network: the queue-backend
// client (presence upsert, job status write-back, live job subscription) and
// the payload fetcher.  The backend itself is an external document store
// with query + change-notification capability; this crate only speaks its
// HTTP interface.

pub mod client;
pub mod fetch;
pub mod sink;
pub mod subscription;

pub use client::BackendClient;
pub use fetch::FileFetcher;
pub use sink::{JobStatusSink, PayloadFetcher};
pub use subscription::JobSubscription;
