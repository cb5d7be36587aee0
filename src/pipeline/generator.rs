//! Job generator: expands (source × format × breakpoint) into jobs and feeds the worker pool.

use crossbeam_channel::{Sender, select};
use log::{debug, error};
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::PipelineError;
use crate::types::{Job, OutputFormat};
use crate::utils::Breakpoints;

use super::context::{CancelToken, GeneratorInput, JobOutcome};

/// All jobs for one source image, in emission order: per format, the native job, then one per
/// height, then one per width. Every job shares `bytes`.
pub fn plan_jobs(
    source_name: &str,
    bytes: &Arc<[u8]>,
    formats: &[OutputFormat],
    breakpoints: &Breakpoints,
    out_dir: &Path,
) -> Vec<Job> {
    let job = |format, width, height| Job {
        source_name: source_name.to_string(),
        source_bytes: Arc::clone(bytes),
        format,
        width,
        height,
        out_dir: out_dir.to_path_buf(),
    };

    let mut jobs = Vec::with_capacity(formats.len() * (1 + breakpoints.len()));
    for &format in formats {
        jobs.push(job(format, 0, 0));
        jobs.extend(breakpoints.heights.iter().map(|&h| job(format, 0, h)));
        jobs.extend(breakpoints.widths.iter().map(|&w| job(format, w, 0)));
    }
    jobs
}

/// Hand one job to the pool, waiting for queue space. False when cancelled or when every
/// worker is gone.
fn emit(job_tx: &Sender<Job>, cancel: &CancelToken, job: Job) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    select! {
        send(job_tx, job) -> res => res.is_ok(),
        recv(cancel.done()) -> _ => false,
    }
}

/// Producer loop. Reads each source once, then emits its jobs. An unreadable source cancels
/// the run before any of its jobs are scheduled. Returns the number of jobs emitted.
pub fn run_producer(
    input: GeneratorInput,
    job_tx: Sender<Job>,
    result_tx: Sender<JobOutcome>,
    cancel: CancelToken,
) -> usize {
    let mut emitted = 0_usize;
    'sources: for name in &input.sources {
        if cancel.is_cancelled() {
            break;
        }
        let path = input.in_dir.join(name);
        let bytes: Arc<[u8]> = match std::fs::read(&path) {
            Ok(b) => b.into(),
            Err(source) => {
                error!("producer: cannot read {}: {}", path.display(), source);
                cancel.cancel();
                let _ = result_tx.send(JobOutcome::Aborted(PipelineError::SourceRead {
                    path,
                    source,
                }));
                break;
            }
        };

        let jobs = plan_jobs(
            name,
            &bytes,
            &input.formats,
            &input.breakpoints,
            &input.out_dir,
        );
        debug!("producer: {} -> {} jobs", name, jobs.len());
        for job in jobs {
            if !emit(&job_tx, &cancel, job) {
                break 'sources;
            }
            emitted += 1;
        }
    }
    debug!("producer: done, {} jobs emitted", emitted);
    // Dropping job_tx lets workers drain the queue and exit; dropping result_tx releases the
    // producer's hold on the collector.
    drop(job_tx);
    drop(result_tx);
    emitted
}

/// Spawn the producer thread. It owns a results sender from the start, so the collector
/// cannot see completion before the first job is emitted.
pub fn spawn_producer_thread(
    input: GeneratorInput,
    job_tx: Sender<Job>,
    result_tx: Sender<JobOutcome>,
    cancel: CancelToken,
) -> JoinHandle<usize> {
    thread::spawn(move || run_producer(input, job_tx, result_tx, cancel))
}
