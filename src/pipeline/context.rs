//! Pipeline context: cancellation token, channels and handles shared by the producer,
//! the worker pool and the collector.

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::{JobError, PipelineError};
use crate::types::{GeneratedVariant, Job, OutputFormat};
use crate::utils::Breakpoints;
use crate::utils::config::JOB_QUEUE_PER_WORKER;

/// Cooperative cancellation shared by every pipeline thread.
///
/// `is_cancelled()` is the cheap check used between units of work. `done()` is a channel
/// that never carries a message and disconnects on cancel, so it can sit in a
/// `select!` next to a blocking send or receive.
#[derive(Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    done_tx: Arc<Mutex<Option<Sender<()>>>>,
    done_rx: Receiver<()>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = bounded::<()>(0);
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            done_tx: Arc::new(Mutex::new(Some(tx))),
            done_rx: rx,
        }
    }

    /// Trigger cancellation. Idempotent; returns true for the call that actually cancelled.
    pub fn cancel(&self) -> bool {
        let first = !self.flag.swap(true, Ordering::SeqCst);
        // Dropping the only sender disconnects `done_rx` and wakes every select! on it.
        if let Ok(mut guard) = self.done_tx.lock() {
            guard.take();
        }
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Becomes ready (disconnected) once cancelled.
    pub fn done(&self) -> &Receiver<()> {
        &self.done_rx
    }
}

/// What a worker (or the producer) reports to the collector.
#[derive(Debug)]
pub enum JobOutcome {
    /// Output file written; the row still has to be recorded by the collector.
    Written {
        variant: GeneratedVariant,
        format: OutputFormat,
    },
    Failed(JobError),
    /// Producer-side failure (e.g. unreadable source file).
    Aborted(PipelineError),
}

/// Static inputs the producer expands into jobs.
#[derive(Clone, Debug)]
pub struct GeneratorInput {
    /// Source images in emission order.
    pub sources: Vec<String>,
    pub in_dir: PathBuf,
    pub out_dir: PathBuf,
    pub formats: Vec<OutputFormat>,
    pub breakpoints: Breakpoints,
}

impl GeneratorInput {
    /// Jobs emitted per source image: one native job plus one per breakpoint, per format.
    pub fn jobs_per_source(&self) -> usize {
        self.formats.len() * (1 + self.breakpoints.len())
    }

    pub fn total_jobs(&self) -> usize {
        self.sources.len() * self.jobs_per_source()
    }
}

/// Channels for the pipeline. Producer gets job_tx and a result_tx clone; workers get
/// job_rx and result_tx clones; the collector keeps result_rx.
pub struct PipelineChannels {
    pub job_tx: Sender<Job>,
    pub job_rx: Receiver<Job>,
    pub result_tx: Sender<JobOutcome>,
    pub result_rx: Receiver<JobOutcome>,
}

pub fn create_pipeline_channels(workers: usize) -> PipelineChannels {
    let (job_tx, job_rx) = bounded::<Job>(workers.max(1) * JOB_QUEUE_PER_WORKER);
    let (result_tx, result_rx) = unbounded::<JobOutcome>();
    PipelineChannels {
        job_tx,
        job_rx,
        result_tx,
        result_rx,
    }
}

/// Handles returned by [`run_pipeline`](crate::pipeline::run_pipeline): receive outcomes and
/// join when `result_rx` disconnects.
pub struct PipelineHandles {
    pub result_rx: Receiver<JobOutcome>,
    /// Producer returns the number of jobs it emitted.
    pub producer_handle: JoinHandle<usize>,
    /// Workers return the number of jobs they ran.
    pub worker_handles: Vec<JoinHandle<usize>>,
    pub cancel: CancelToken,
}

/// Worker pool sizing and per-job limits.
#[derive(Clone, Copy, Debug)]
pub struct PipelineConfig {
    pub workers: usize,
    /// Deadline for one job's transform. `None` disables it.
    pub resize_timeout: Option<Duration>,
}
