//! Result collector: single store writer and first-error-wins cancellation.

use crossbeam_channel::Receiver;
use log::{debug, error};
use rusqlite::Connection;

use crate::engine::db_ops::add_variant;
use crate::error::{JobError, JobFailure, PipelineError};

use super::context::{CancelToken, JobOutcome};

/// What the collector saw before the results channel closed.
#[derive(Debug, Default)]
pub struct CollectOutcome {
    /// Variant rows recorded.
    pub written: usize,
    /// First failure reported; later ones are only logged.
    pub first_error: Option<PipelineError>,
    /// Failures that arrived after the first one.
    pub suppressed: usize,
}

impl CollectOutcome {
    fn record_failure(&mut self, err: PipelineError, cancel: &CancelToken) {
        cancel.cancel();
        if self.first_error.is_none() {
            error!("{}", err);
            self.first_error = Some(err);
        } else {
            debug!("collector: suppressed later failure: {}", err);
            self.suppressed += 1;
        }
    }
}

/// Drain `result_rx` until every sender (producer and workers) has hung up.
///
/// Written variants are inserted here, so the store has exactly one writer. After the first
/// failure no further rows are inserted; files already written stay on disk.
pub fn collect_results(
    result_rx: &Receiver<JobOutcome>,
    conn: &Connection,
    cancel: &CancelToken,
    on_stored: Option<&(dyn Fn(usize) + Send)>,
) -> CollectOutcome {
    let mut outcome = CollectOutcome::default();
    while let Ok(msg) = result_rx.recv() {
        match msg {
            JobOutcome::Written { variant, format } => {
                if outcome.first_error.is_some() {
                    debug!("collector: not recording {} after failure", variant.filename);
                    continue;
                }
                match add_variant(conn, &variant) {
                    Ok(()) => {
                        outcome.written += 1;
                        if let Some(cb) = on_stored {
                            cb(1);
                        }
                    }
                    Err(e) => {
                        let err = JobError {
                            target: variant.target_label(),
                            source_name: variant.source_image_name,
                            format,
                            failure: JobFailure::Store(e),
                        };
                        outcome.record_failure(err.into(), cancel);
                    }
                }
            }
            JobOutcome::Failed(err) => outcome.record_failure(err.into(), cancel),
            JobOutcome::Aborted(err) => outcome.record_failure(err, cancel),
        }
    }
    debug!(
        "collector: results channel closed, {} variants recorded",
        outcome.written
    );
    outcome
}
