//! Error types for the imgen build pipeline.
//!
//! Configuration problems are raised before any thread starts. Everything that goes wrong
//! once the pipeline is running ends up as a [`PipelineError`], carrying the first failing
//! job's context.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::OutputFormat;

/// Startup configuration errors (manifest, breakpoints, config file, flags).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{0}: invalid processor")]
    UnknownProcessor(String),

    #[error("{0}: unknown output format")]
    UnknownFormat(String),

    #[error("breakpoint values must be positive (found 0 in {0})")]
    ZeroBreakpoint(&'static str),

    #[error("{0}: not listed in the manifest")]
    NotInManifest(String),

    #[error("no output formats selected")]
    NoFormats,
}

/// Failures reported by an image transform backend.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("could not decode image: {0}")]
    Decode(String),

    #[error("could not resize to {width}x{height}: {message}")]
    Resize {
        width: u32,
        height: u32,
        message: String,
    },

    #[error("cannot set both width ({width}) and height ({height})")]
    BothDimensions { width: u32, height: u32 },

    #[error("could not encode {format}: {message}")]
    Encode {
        format: OutputFormat,
        message: String,
    },

    #[error("no output format set")]
    FormatNotSet,

    #[error("could not compute dominant color: {0}")]
    DominantColor(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(std::time::Duration),
}

/// Metadata store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("could not remove the existing database {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no matching variant found")]
    NotFound,

    #[error("invalid variant {filename}: {reason}")]
    InvalidVariant {
        filename: String,
        reason: &'static str,
    },
}

/// Why a single job failed.
#[derive(Error, Debug)]
pub enum JobFailure {
    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("could not record variant: {0}")]
    Store(#[from] StoreError),
}

/// A failed job with enough context to diagnose it.
#[derive(Error, Debug)]
#[error("job {source_name} [{format} {target}] failed: {failure}")]
pub struct JobError {
    pub source_name: String,
    pub format: OutputFormat,
    /// `native`, `w=N` or `h=N`.
    pub target: String,
    #[source]
    pub failure: JobFailure,
}

/// Terminal result of a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not read source image {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("source image {name}: {source}")]
    SourceTransform {
        name: String,
        #[source]
        source: TransformError,
    },

    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("run cancelled before completion")]
    Cancelled,

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;
