//! Batch Driver: process every pending document once.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};

use tracing::{error, info, warn};

use super::assembler::DocumentAssembler;
use super::monitor::ShutdownSignal;

/// Counters for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Documents attempted.
    pub seen: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn absorb(&mut self, other: BatchSummary) {
        self.seen += other.seen;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}

pub struct BatchDriver {
    assembler: DocumentAssembler,
    shutdown: Option<ShutdownSignal>,
}

impl BatchDriver {
    pub fn new(assembler: DocumentAssembler) -> Self {
        Self {
            assembler,
            shutdown: None,
        }
    }

    /// Stop between documents once `signal` fires.
    pub fn with_shutdown(mut self, signal: ShutdownSignal) -> Self {
        self.shutdown = Some(signal);
        self
    }

    pub fn has_pending(&self) -> io::Result<bool> {
        Ok(!self.assembler.lifecycle().pending_documents()?.is_empty())
    }

    /// Run one batch over a snapshot of the pending directory.
    ///
    /// A failing (or panicking) document is counted and the batch moves on.
    /// Only failure to list the pending directory is an error.
    pub fn run_batch(&self) -> io::Result<BatchSummary> {
        let lifecycle = self.assembler.lifecycle();
        let documents = lifecycle.pending_documents()?;
        let mut summary = BatchSummary::default();

        if documents.is_empty() {
            info!("No pending documents in {}", lifecycle.pending_dir().display());
        } else {
            info!("Found {} pending documents", documents.len());
        }

        for document in &documents {
            if self.shutdown_requested() {
                info!("Shutdown requested, stopping batch before {}", document.file_name);
                break;
            }

            summary.seen += 1;
            info!("Processing {} ({}/{})", document.file_name, summary.seen, documents.len());

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.assembler.process(document)));
            match outcome {
                Ok(Ok(_)) => summary.succeeded += 1,
                Ok(Err(e)) => {
                    summary.failed += 1;
                    error!("Failed to process {}: {}", document.file_name, e);
                }
                Err(payload) => {
                    summary.failed += 1;
                    error!(
                        "Processing {} panicked: {}",
                        document.file_name,
                        panic_message(payload.as_ref())
                    );
                }
            }
        }

        match lifecycle.sweep_scratch() {
            Ok(0) => {}
            Ok(n) => warn!("Removed {} orphaned scratch entries", n),
            Err(e) => warn!("Could not sweep {}: {}", lifecycle.scratch_dir().display(), e),
        }

        info!(
            "Batch complete: seen={} succeeded={} failed={}",
            summary.seen, summary.succeeded, summary.failed
        );
        Ok(summary)
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|s| s.is_requested())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
