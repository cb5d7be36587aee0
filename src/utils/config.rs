//! Application configuration constants.
//! Defaults and tuning in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived file names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    db_filename: String,
    config_filename: String,
    manifest_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                db_filename: "metadata.db".to_string(),
                config_filename: format!(".{pkg}.toml"),
                manifest_filename: "metadata.json".to_string(),
            }
        })
    }

    /// Metadata store filename inside the output directory.
    pub fn db_filename(&self) -> &str {
        &self.db_filename
    }

    /// Optional per-input-directory config file (`.imgen.toml`).
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Manifest filename inside the input directory.
    pub fn manifest_filename(&self) -> &str {
        &self.manifest_filename
    }
}

// ---- CLI defaults ----

pub struct Defaults;

impl Defaults {
    pub const IN_DIR: &'static str = "img-src";
    pub const OUT_DIR: &'static str = "img-out";
    pub const BREAKPOINTS_FILE: &'static str = "config/breakpoints.json";
    /// Upper bound for a single resize before the job fails.
    pub const RESIZE_TIMEOUT_SECS: u64 = 120;
}

// ---- Worker threads ----

/// Worker count limits.
#[derive(Clone, Copy, Debug)]
pub struct WorkerThreadLimits {
    /// Available threads (from rayon); set by [`WorkerThreadLimits::current()`].
    pub all_threads: usize,
    pub floor: usize,
}

impl Default for WorkerThreadLimits {
    fn default() -> Self {
        Self {
            all_threads: 0, // use current() to set from rayon
            floor: Self::FLOOR_THREADS,
        }
    }
}

impl WorkerThreadLimits {
    pub const FLOOR_THREADS: usize = 1;

    /// Build limits with `all_threads` set from `rayon::current_num_threads()`.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            ..Self::default()
        }
    }

    /// Requested worker count, or all available threads; never below the floor.
    pub fn resolve(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.all_threads).max(self.floor)
    }
}

// ---- Encoding ----

pub struct EncodeConsts;

impl EncodeConsts {
    /// JPEG quality (0-100).
    pub const JPEG_QUALITY: u8 = 80;
    /// Longest edge of the thumbnail sampled for the dominant colour.
    pub const DOMINANT_COLOR_SAMPLE: u32 = 64;
}

// ---- Pipeline ----

/// Job queue capacity per worker. Keeps the producer at most this far ahead of the pool.
pub const JOB_QUEUE_PER_WORKER: usize = 1;

/// Hex digits kept from the content hash in output filenames (32 bits).
pub const CONTENT_HASH_HEX_LEN: usize = 8;
