// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-job execution pipeline: validate target printer → fetch payload →
// dispatch → write exactly one terminal status.
//
// Each step's failure short-circuits to its own terminal status and no later
// step runs.  Every error is caught at this boundary; nothing a job does can
// abort the subscription or the heartbeat loop.  The status write-back is
// the single commit point — there is no retry of a failed job, only an
// external re-enqueue.

use std::sync::Arc;

use tracing::{error, info, warn};

use spoolwerk_backend::sink::{JobStatusSink, PayloadFetcher};
use spoolwerk_core::types::{JobStatus, PrintJob};
use spoolwerk_print::{PrintDispatcher, PrinterInventory};

/// Run one job to its terminal status and record it.
///
/// Takes owned handles so each job can run in its own spawned task; the
/// steps inside stay strictly sequential for that job.
pub async fn process_job(
    job: PrintJob,
    inventory: PrinterInventory,
    fetcher: Arc<dyn PayloadFetcher>,
    dispatcher: PrintDispatcher,
    sink: Arc<dyn JobStatusSink>,
) {
    let status = run_steps(&job, inventory, fetcher, dispatcher).await;
    info!(job_id = %job.job_id, ?status, "job reached terminal state");

    if let Err(e) = sink.record_status(&job.job_id, status).await {
        // The job was handled but the commit point failed; the backend will
        // still show it pending.  Nothing propagates past here.
        error!(job_id = %job.job_id, ?status, error = %e, "status write-back failed");
    }
}

async fn run_steps(
    job: &PrintJob,
    inventory: PrinterInventory,
    fetcher: Arc<dyn PayloadFetcher>,
    dispatcher: PrintDispatcher,
) -> JobStatus {
    // 1. Re-validate the target printer against the live ready set.  The
    //    inventory shells out to the spooler, so it runs off the async
    //    threads.
    let printer = job.target_printer.clone();
    let ready = tokio::task::spawn_blocking(move || inventory.is_ready(&printer)).await;
    match ready {
        Ok(Ok(true)) => {}
        Ok(Ok(false)) => {
            warn!(job_id = %job.job_id, printer = %job.target_printer, "target printer not in ready set");
            return JobStatus::PrinterNotFound;
        }
        Ok(Err(e)) => {
            warn!(job_id = %job.job_id, error = %e, "printer validation failed");
            return JobStatus::PrinterNotFound;
        }
        Err(e) => {
            error!(job_id = %job.job_id, error = %e, "printer validation task failed");
            return JobStatus::PrinterNotFound;
        }
    }

    // 2. Fetch the payload into the scratch directory.
    let path = match fetcher.fetch_to_scratch(&job.job_id, &job.source_url).await {
        Ok(path) => path,
        Err(e) => {
            warn!(job_id = %job.job_id, url = %job.source_url, error = %e, "payload download failed");
            return JobStatus::DownloadFailed;
        }
    };

    // 3. Hand the file to the spooler.
    let printer = job.target_printer.clone();
    let dispatched =
        tokio::task::spawn_blocking(move || dispatcher.print(&path, &printer)).await;
    match dispatched {
        Ok(Ok(())) => JobStatus::Printed,
        Ok(Err(e)) => {
            warn!(job_id = %job.job_id, error = %e, "dispatch failed");
            JobStatus::DriverFailed
        }
        Err(e) => {
            error!(job_id = %job.job_id, error = %e, "dispatch task failed");
            JobStatus::DriverFailed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use spoolwerk_core::error::{Result, SpoolwerkError};
    use spoolwerk_core::types::JobId;
    use spoolwerk_print::platform::{PrintSubsystem, PrinterState};

    struct FakeSubsystem {
        ready_printers: Vec<&'static str>,
        submit_calls: AtomicUsize,
        submit_fails: bool,
    }

    impl FakeSubsystem {
        fn new(ready_printers: Vec<&'static str>, submit_fails: bool) -> Arc<Self> {
            Arc::new(Self {
                ready_printers,
                submit_calls: AtomicUsize::new(0),
                submit_fails,
            })
        }
    }

    impl PrintSubsystem for FakeSubsystem {
        fn printer_names(&self) -> Result<Vec<String>> {
            Ok(self.ready_printers.iter().map(|s| s.to_string()).collect())
        }
        fn printer_state(&self, _: &str) -> Result<PrinterState> {
            Ok(PrinterState {
                offline: false,
                error: false,
            })
        }
        fn submit(&self, _: &Path, _: &str) -> Result<()> {
            self.submit_calls.fetch_add(1, Ordering::SeqCst);
            if self.submit_fails {
                Err(SpoolwerkError::Dispatch("spooler said no".into()))
            } else {
                Ok(())
            }
        }
    }

    struct CountingFetcher {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl PayloadFetcher for CountingFetcher {
        async fn fetch_to_scratch(&self, job_id: &JobId, _url: &str) -> Result<PathBuf> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(SpoolwerkError::Download("HTTP 404".into()))
            } else {
                Ok(PathBuf::from(format!("/tmp/scratch/{job_id}.pdf")))
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        recorded: Mutex<Vec<(JobId, JobStatus)>>,
    }

    #[async_trait]
    impl JobStatusSink for RecordingSink {
        async fn record_status(&self, job_id: &JobId, status: JobStatus) -> Result<()> {
            self.recorded
                .lock()
                .expect("sink lock")
                .push((job_id.clone(), status));
            Ok(())
        }
    }

    fn job_for(printer: &str) -> PrintJob {
        PrintJob {
            job_id: JobId::from("job-1"),
            target_device_id: "dev-1".into(),
            target_printer: printer.into(),
            source_url: "https://files.example/receita.pdf".into(),
            status: JobStatus::Pending,
        }
    }

    struct Harness {
        subsystem: Arc<FakeSubsystem>,
        fetcher: Arc<CountingFetcher>,
        sink: Arc<RecordingSink>,
    }

    impl Harness {
        fn new(ready: Vec<&'static str>, fetch_fails: bool, submit_fails: bool) -> Self {
            Self {
                subsystem: FakeSubsystem::new(ready, submit_fails),
                fetcher: Arc::new(CountingFetcher {
                    calls: AtomicUsize::new(0),
                    fail: fetch_fails,
                }),
                sink: Arc::new(RecordingSink::default()),
            }
        }

        async fn run(&self, job: PrintJob) {
            process_job(
                job,
                PrinterInventory::new(self.subsystem.clone()),
                self.fetcher.clone(),
                PrintDispatcher::new(self.subsystem.clone()),
                self.sink.clone(),
            )
            .await;
        }

        fn recorded(&self) -> Vec<(JobId, JobStatus)> {
            self.sink.recorded.lock().expect("sink lock").clone()
        }
    }

    #[tokio::test]
    async fn happy_path_ends_printed() {
        let h = Harness::new(vec!["LaserOne"], false, false);
        h.run(job_for("LaserOne")).await;

        assert_eq!(h.recorded(), vec![(JobId::from("job-1"), JobStatus::Printed)]);
        assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.subsystem.submit_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_printer_skips_fetch_and_dispatch() {
        let h = Harness::new(vec!["LaserOne"], false, false);
        h.run(job_for("Ghost")).await;

        assert_eq!(
            h.recorded(),
            vec![(JobId::from("job-1"), JobStatus::PrinterNotFound)]
        );
        assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.subsystem.submit_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn download_failure_skips_dispatch() {
        let h = Harness::new(vec!["LaserOne"], true, false);
        h.run(job_for("LaserOne")).await;

        assert_eq!(
            h.recorded(),
            vec![(JobId::from("job-1"), JobStatus::DownloadFailed)]
        );
        assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.subsystem.submit_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dispatch_failure_ends_driver_failed() {
        let h = Harness::new(vec!["LaserOne"], false, true);
        h.run(job_for("LaserOne")).await;

        assert_eq!(
            h.recorded(),
            vec![(JobId::from("job-1"), JobStatus::DriverFailed)]
        );
        assert_eq!(h.subsystem.submit_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exactly_one_terminal_status_per_job() {
        let h = Harness::new(vec!["LaserOne"], false, false);
        h.run(job_for("LaserOne")).await;
        assert_eq!(h.recorded().len(), 1);
        assert!(h.recorded()[0].1.is_terminal());
    }
}
