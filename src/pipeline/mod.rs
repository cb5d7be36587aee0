//! Pipeline components: job generator, worker pool, result collector and their wiring.

pub mod collector;
pub mod context;
pub mod generator;
pub mod orchestrator;
pub mod worker;

pub use collector::{CollectOutcome, collect_results};
pub use context::{
    CancelToken, GeneratorInput, JobOutcome, PipelineChannels, PipelineConfig, PipelineHandles,
    create_pipeline_channels,
};
pub use generator::{plan_jobs, run_producer, spawn_producer_thread};
pub use orchestrator::{execute_pipeline, finish_pipeline, run_pipeline};
pub use worker::{run_job, spawn_workers};
