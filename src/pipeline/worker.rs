//! Worker pool: each worker renders jobs, writes the output file and reports the variant row.

use crossbeam_channel::{Receiver, Sender, select};
use log::{debug, trace};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::engine::hashing::variant_filename_for;
use crate::error::{JobError, JobFailure, TransformError};
use crate::transform::{ImageProcessor, JobContext, render_variant};
use crate::types::{GeneratedVariant, Job};

use super::context::{CancelToken, JobOutcome};

fn non_zero(v: u32) -> Option<u32> {
    (v != 0).then_some(v)
}

/// Render one job and write its file. Returns the row to record.
pub fn run_job(
    job: &Job,
    processor: &dyn ImageProcessor,
    cancel: &CancelToken,
    timeout: Option<Duration>,
) -> Result<GeneratedVariant, JobFailure> {
    let ctx = JobContext::with_timeout(cancel.clone(), timeout);
    let encoded = render_variant(
        processor,
        &ctx,
        &job.source_bytes,
        job.format,
        job.width,
        job.height,
    )?;

    let filename = variant_filename_for(
        &job.source_name,
        job.width,
        job.height,
        job.format,
        &encoded,
    );
    let path = job.out_dir.join(&filename);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| JobFailure::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(&path, &encoded).map_err(|source| JobFailure::Io {
        path: path.clone(),
        source,
    })?;

    Ok(GeneratedVariant {
        filename,
        source_image_name: job.source_name.clone(),
        width: non_zero(job.width),
        height: non_zero(job.height),
        format: job.format.name().to_string(),
    })
}

/// Single worker: take jobs until the queue closes or the run is cancelled.
/// A failed job cancels the run before it is reported. Returns the number of jobs started.
fn worker_loop(
    id: usize,
    job_rx: Receiver<Job>,
    result_tx: Sender<JobOutcome>,
    processor: Arc<dyn ImageProcessor>,
    cancel: CancelToken,
    timeout: Option<Duration>,
) -> usize {
    let mut started = 0_usize;
    loop {
        let job = select! {
            recv(job_rx) -> msg => match msg {
                Ok(job) => job,
                Err(_) => break,
            },
            recv(cancel.done()) -> _ => break,
        };
        if cancel.is_cancelled() {
            break;
        }
        started += 1;
        trace!("worker {}: {} [{} {}]", id, job.source_name, job.format, job.target_label());

        match run_job(&job, processor.as_ref(), &cancel, timeout) {
            Ok(variant) => {
                let outcome = JobOutcome::Written {
                    variant,
                    format: job.format,
                };
                if result_tx.send(outcome).is_err() {
                    break;
                }
            }
            // Interrupted by someone else's cancellation; the canceller reports the cause.
            Err(JobFailure::Transform(TransformError::Cancelled)) if cancel.is_cancelled() => {
                debug!("worker {}: {} interrupted", id, job.source_name);
                break;
            }
            Err(failure) => {
                cancel.cancel();
                let _ = result_tx.send(JobOutcome::Failed(JobError {
                    source_name: job.source_name.clone(),
                    format: job.format,
                    target: job.target_label(),
                    failure,
                }));
                break;
            }
        }
    }
    debug!("worker {}: exiting after {} jobs", id, started);
    started
}

/// Spawn `workers` threads sharing `job_rx`. Each holds its own results sender; the caller
/// drops its copy so the collector sees the channel close once every worker is done.
pub fn spawn_workers(
    workers: usize,
    job_rx: Receiver<Job>,
    result_tx: &Sender<JobOutcome>,
    processor: &Arc<dyn ImageProcessor>,
    cancel: &CancelToken,
    timeout: Option<Duration>,
) -> Vec<JoinHandle<usize>> {
    (0..workers.max(1))
        .map(|id| {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let processor = Arc::clone(processor);
            let cancel = cancel.clone();
            thread::spawn(move || worker_loop(id, job_rx, result_tx, processor, cancel, timeout))
        })
        .collect()
}
