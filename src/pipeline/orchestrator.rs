use log::debug;
use rusqlite::Connection;
use std::sync::Arc;

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline;
use crate::transform::ImageProcessor;

use super::context::{CancelToken, GeneratorInput, PipelineConfig, PipelineHandles};

/// Start the producer and worker pool. Caller receives outcomes from `result_rx` and must
/// join `producer_handle` and `worker_handles` once it disconnects.
pub fn run_pipeline(
    input: GeneratorInput,
    processor: Arc<dyn ImageProcessor>,
    config: PipelineConfig,
    cancel: CancelToken,
) -> PipelineHandles {
    let channels = pipeline::create_pipeline_channels(config.workers);

    let producer_handle = pipeline::spawn_producer_thread(
        input,
        channels.job_tx,
        channels.result_tx.clone(),
        cancel.clone(),
    );

    let worker_handles = pipeline::spawn_workers(
        config.workers,
        channels.job_rx,
        &channels.result_tx,
        &processor,
        &cancel,
        config.resize_timeout,
    );

    // Producer and workers now hold the only result senders.
    drop(channels.result_tx);

    PipelineHandles {
        result_rx: channels.result_rx,
        producer_handle,
        worker_handles,
        cancel,
    }
}

/// Collect every outcome into `conn`, join all threads and turn the run into one result:
/// the first failure, `Cancelled` when interrupted without one, else the number of variants.
pub fn finish_pipeline(
    handles: PipelineHandles,
    conn: &Connection,
    on_stored: Option<&(dyn Fn(usize) + Send)>,
) -> PipelineResult<usize> {
    let PipelineHandles {
        result_rx,
        producer_handle,
        worker_handles,
        cancel,
    } = handles;

    let outcome = pipeline::collect_results(&result_rx, conn, &cancel, on_stored);

    let mut panicked = None;
    match producer_handle.join() {
        Ok(emitted) => debug!("main: producer emitted {} jobs", emitted),
        Err(_) => panicked = Some(PipelineError::ThreadPanicked("producer")),
    }
    let mut started = 0_usize;
    for h in worker_handles {
        match h.join() {
            Ok(n) => started += n,
            Err(_) => panicked = panicked.or(Some(PipelineError::ThreadPanicked("worker"))),
        }
    }
    debug!("main: workers started {} jobs", started);

    if let Some(err) = outcome.first_error.or(panicked) {
        return Err(err);
    }
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    Ok(outcome.written)
}

/// Run the whole pipeline to completion on the calling thread's store connection.
pub fn execute_pipeline(
    input: GeneratorInput,
    processor: Arc<dyn ImageProcessor>,
    config: PipelineConfig,
    conn: &Connection,
    cancel: CancelToken,
    on_stored: Option<&(dyn Fn(usize) + Send)>,
) -> PipelineResult<usize> {
    let handles = run_pipeline(input, processor, config, cancel);
    finish_pipeline(handles, conn, on_stored)
}
