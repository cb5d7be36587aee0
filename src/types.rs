//! Public and internal types for the imgen API and pipeline.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::transform::ProcessorKind;

/// Output encoding for a generated variant. Closed set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Webp,
}

impl OutputFormat {
    /// Every format the pipeline knows how to produce, in emission order.
    pub const ALL: [OutputFormat; 2] = [OutputFormat::Jpeg, OutputFormat::Webp];

    /// Short name used in output filenames and in the `format` column of the store.
    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Webp => "webp",
        }
    }

    /// File extension of the encoded output.
    pub fn ext(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Webp => "webp",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    /// Accepts the short name, the common long name, or the MIME type.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "image/jpeg" => Ok(OutputFormat::Jpeg),
            "webp" | "image/webp" => Ok(OutputFormat::Webp),
            other => Err(ConfigError::UnknownFormat(other.to_string())),
        }
    }
}

/// One original image, as registered in the `source_image` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourceImage {
    /// Source filename; unique key.
    pub name: String,
    pub capture_date: String,
    pub location: String,
    /// Hex colour, e.g. `#A0B1C2`.
    pub dominant_color: String,
}

/// One produced output file, as stored in the `generated_variant` table.
///
/// `width` and `height` are never both set: a variant is constrained along one axis
/// (or none, for the native-resolution variant).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GeneratedVariant {
    /// On-disk output name (content-hash qualified); unique key.
    pub filename: String,
    pub source_image_name: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Short format name (see [`OutputFormat::name`]).
    pub format: String,
}

impl GeneratedVariant {
    /// Same labels as [`Job::target_label`].
    pub fn target_label(&self) -> String {
        match (self.width, self.height) {
            (None, None) => "native".to_string(),
            (Some(w), None) => format!("w={w}"),
            (None, Some(h)) => format!("h={h}"),
            (Some(w), Some(h)) => format!("w={w},h={h}"),
        }
    }
}

/// Result of a best-variant lookup: the variant row joined with its source image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VariantMatch {
    pub filename: String,
    pub name: String,
    pub capture_date: String,
    pub location: String,
    pub dominant_color: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: String,
}

/// One unit of resize work. Consumed exactly once by one worker.
///
/// `width == 0 && height == 0` means native resolution (re-encode only).
#[derive(Clone, Debug)]
pub struct Job {
    pub source_name: String,
    /// Raw bytes of the source file; shared read-only by every job of the same source.
    pub source_bytes: Arc<[u8]>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub out_dir: PathBuf,
}

impl Job {
    pub fn is_native(&self) -> bool {
        self.width == 0 && self.height == 0
    }

    /// Human-readable target, e.g. `w=480`, `h=800` or `native`.
    pub fn target_label(&self) -> String {
        match (self.width, self.height) {
            (0, 0) => "native".to_string(),
            (w, 0) => format!("w={w}"),
            (0, h) => format!("h={h}"),
            (w, h) => format!("w={w},h={h}"),
        }
    }
}

/// Resolved options for a build run (defaults → `.imgen.toml` → CLI).
#[derive(Clone, Debug)]
pub struct Opts {
    pub in_dir: PathBuf,
    pub out_dir: PathBuf,
    /// Breakpoints JSON file.
    pub breakpoints_path: PathBuf,
    /// Metadata store path. When None, `<out_dir>/metadata.db`.
    pub db_path: Option<PathBuf>,
    /// Worker count. When None, derived from available parallelism.
    pub workers: Option<usize>,
    pub processor: ProcessorKind,
    /// Output formats. When empty, the processor's best formats.
    pub formats: Vec<OutputFormat>,
    /// Per-resize deadline in seconds (0 disables the deadline).
    pub resize_timeout_secs: u64,
    /// Restrict the run to these manifest entries. Empty means all.
    pub images: Vec<String>,
    /// Show progress bar and debug logs.
    pub verbose: bool,
}

impl Default for Opts {
    fn default() -> Self {
        use crate::utils::config::Defaults;
        Self {
            in_dir: PathBuf::from(Defaults::IN_DIR),
            out_dir: PathBuf::from(Defaults::OUT_DIR),
            breakpoints_path: PathBuf::from(Defaults::BREAKPOINTS_FILE),
            db_path: None,
            workers: None,
            processor: ProcessorKind::default(),
            formats: Vec::new(),
            resize_timeout_secs: Defaults::RESIZE_TIMEOUT_SECS,
            images: Vec::new(),
            verbose: false,
        }
    }
}

impl Opts {
    /// Store path, defaulting to the package DB filename inside the output directory.
    pub fn db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| {
            self.out_dir
                .join(crate::utils::config::PackagePaths::get().db_filename())
        })
    }

    /// Manifest path: always `metadata.json` inside the input directory.
    pub fn manifest_path(&self) -> PathBuf {
        self.in_dir
            .join(crate::utils::config::PackagePaths::get().manifest_filename())
    }
}

/// Counters reported at the end of a successful run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub sources: usize,
    pub jobs_planned: usize,
    pub variants_written: usize,
}
