//! Full build run: fresh store, source registration, worker pool, summary.

use log::{debug, info};
use rayon::prelude::*;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::engine::db_ops::{add_source_image, open_store_fresh};
use crate::engine::progress::{finish_progress_bar, progress_callback, setup_progress};
use crate::error::{ConfigError, PipelineError, PipelineResult, StoreError};
use crate::pipeline::{CancelToken, GeneratorInput, PipelineConfig, execute_pipeline};
use crate::transform::{ImageProcessor, build_processor};
use crate::utils::config::WorkerThreadLimits;
use crate::utils::{Colors, Manifest, load_breakpoints, load_manifest, select_entries};
use crate::{BuildSummary, OutputFormat, Opts, SourceImage};

/// Requested formats (deduplicated, order kept), or the processor's best formats when none
/// were requested.
pub fn resolve_formats(
    requested: &[OutputFormat],
    processor: &dyn ImageProcessor,
) -> Result<Vec<OutputFormat>, ConfigError> {
    let candidates = if requested.is_empty() {
        processor.best_formats()
    } else {
        requested.to_vec()
    };
    let mut formats = Vec::with_capacity(candidates.len());
    for f in candidates {
        if !formats.contains(&f) {
            formats.push(f);
        }
    }
    if formats.is_empty() {
        return Err(ConfigError::NoFormats);
    }
    Ok(formats)
}

fn create_dir(path: &Path) -> PipelineResult<()> {
    std::fs::create_dir_all(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Build one [`SourceImage`] per manifest entry. The dominant colour comes from the manifest
/// when given, otherwise it is computed from the file. Runs in parallel; output keeps
/// manifest order. Entries not yet started when `cancel` fires are skipped and the call
/// returns `Cancelled`.
pub fn describe_sources(
    in_dir: &Path,
    manifest: &Manifest,
    processor: &dyn ImageProcessor,
    cancel: &CancelToken,
) -> PipelineResult<Vec<SourceImage>> {
    manifest
        .par_iter()
        .map(|(name, entry)| -> PipelineResult<SourceImage> {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            let dominant_color = match &entry.main_color {
                Some(c) => c.clone(),
                None => {
                    let path = in_dir.join(name);
                    let bytes = std::fs::read(&path)
                        .map_err(|source| PipelineError::SourceRead { path, source })?;
                    let as_source_err = |source| PipelineError::SourceTransform {
                        name: name.clone(),
                        source,
                    };
                    let handle = processor.decode(&bytes).map_err(as_source_err)?;
                    handle.dominant_color().map_err(as_source_err)?
                }
            };
            debug!("{}: dominant color {}", name, dominant_color);
            Ok(SourceImage {
                name: name.clone(),
                capture_date: entry.date.clone(),
                location: entry.location.clone(),
                dominant_color,
            })
        })
        .collect()
}

/// Insert every source image row. Must finish before any variant is recorded.
pub fn register_sources(conn: &Connection, sources: &[SourceImage]) -> PipelineResult<()> {
    let tx = conn.unchecked_transaction().map_err(StoreError::from)?;
    for image in sources {
        add_source_image(&tx, image)?;
    }
    tx.commit().map_err(StoreError::from)?;
    Ok(())
}

/// Run a build with the processor named in `opts`.
pub fn build_variants(opts: &Opts, cancel: &CancelToken) -> PipelineResult<BuildSummary> {
    build_with_processor(opts, build_processor(opts.processor), cancel)
}

/// Run a build with an explicit backend. The store at `opts.db_path()` is recreated; on
/// failure the partial store and output files are left in place.
///
/// A resize interrupted by cancellation or its deadline is abandoned, not stopped: its helper
/// thread may keep using CPU for a while after this returns.
pub fn build_with_processor(
    opts: &Opts,
    processor: Arc<dyn ImageProcessor>,
    cancel: &CancelToken,
) -> PipelineResult<BuildSummary> {
    let start = Instant::now();

    let manifest = select_entries(load_manifest(&opts.manifest_path())?, &opts.images)?;
    let breakpoints = load_breakpoints(&opts.breakpoints_path)?;
    let formats = resolve_formats(&opts.formats, processor.as_ref())?;
    let workers = WorkerThreadLimits::current().resolve(opts.workers);
    debug!(
        "{} CONFIG: processor={} formats={:?} workers={} breakpoints={:?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        processor.name(),
        formats,
        workers,
        breakpoints
    );

    create_dir(&opts.out_dir)?;
    let db_path = opts.db_path();
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir(parent)?;
    }
    let conn = open_store_fresh(&db_path)?;

    let sources = describe_sources(&opts.in_dir, &manifest, processor.as_ref(), cancel)?;
    register_sources(&conn, &sources)?;

    let input = GeneratorInput {
        sources: manifest.keys().cloned().collect(),
        in_dir: opts.in_dir.clone(),
        out_dir: opts.out_dir.clone(),
        formats,
        breakpoints,
    };
    let jobs_planned = input.total_jobs();
    info!(
        "Rendering {} variants of {} images with {} workers",
        jobs_planned,
        sources.len(),
        workers
    );

    let bar = setup_progress(opts.verbose, jobs_planned);
    let on_stored = progress_callback(&bar);
    let config = PipelineConfig {
        workers,
        resize_timeout: (opts.resize_timeout_secs > 0)
            .then(|| Duration::from_secs(opts.resize_timeout_secs)),
    };
    let result = execute_pipeline(
        input,
        processor,
        config,
        &conn,
        cancel.clone(),
        on_stored.as_deref(),
    );
    if let Some(b) = &bar {
        finish_progress_bar(b);
    }
    let variants_written = result?;

    info!(
        "{} | {} in {:.2?}",
        Colors::colorize(Colors::SOURCES, &format!("Sources: {}", sources.len())),
        Colors::colorize(
            Colors::VARIANTS,
            &format!("Variants: {}", variants_written)
        ),
        start.elapsed()
    );

    Ok(BuildSummary {
        sources: sources.len(),
        jobs_planned,
        variants_written,
    })
}
