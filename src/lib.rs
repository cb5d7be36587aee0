//! imgen: pre-render responsive image variants and record them in a SQLite metadata store.
//!
//! A build reads `metadata.json` from the input directory and a breakpoints file, registers
//! every source image, then fans (source × format × breakpoint) jobs out to a worker pool.
//! The first failing job cancels the run. [`lookup_variant`] is the serving-side query.

pub mod build;
pub mod check;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod transform;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use build::{build_variants, build_with_processor};
pub use check::{CheckReport, check_dir};
pub use error::{
    ConfigError, JobError, JobFailure, PipelineError, PipelineResult, StoreError, StoreResult,
    TransformError,
};
pub use pipeline::CancelToken;
pub use transform::{ImageHandle, ImageProcessor, ProcessorKind, build_processor};

use std::path::Path;

/// Open the store at `db_path` read-only and return the best variant for the request.
/// `name: None` picks a random source image; `width`/`height` None match native variants.
pub fn lookup_variant(
    db_path: &Path,
    name: Option<&str>,
    width: Option<u32>,
    height: Option<u32>,
    format: OutputFormat,
) -> StoreResult<VariantMatch> {
    let conn = engine::db_ops::open_store_read_only(db_path)?;
    engine::db_ops::find_best_variant(&conn, name, width, height, format.name())
}
