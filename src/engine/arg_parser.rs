use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::utils::config::{Defaults, PackagePaths};

/// Pre-render responsive image variants and record them in a metadata store.
#[derive(Clone, Parser)]
#[command(name = "imgen")]
#[command(about = "Render image variants for every breakpoint and format; record them in SQLite.")]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub build: BuildArgs,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Look up the best pre-rendered variant and print it as JSON.
    Lookup(LookupArgs),
    /// Compare the manifest with the image files in the input directory.
    Check(CheckArgs),
}

/// Arguments for the default build command.
#[derive(Clone, Args, Default)]
pub struct BuildArgs {
    /// Only render these manifest entries. Default: every entry.
    #[arg(value_name = "IMAGE")]
    pub images: Vec<String>,

    /// Source image directory (holds metadata.json). Default: img-src.
    #[arg(long, short = 'i')]
    pub in_dir: Option<PathBuf>,

    /// Output directory for variants. Default: img-out.
    #[arg(long, short = 'o')]
    pub out_dir: Option<PathBuf>,

    /// Breakpoints JSON file. Default: config/breakpoints.json.
    #[arg(long, short = 'b')]
    pub breakpoints: Option<PathBuf>,

    /// Metadata store path. Default: `metadata.db` in the output directory.
    #[arg(long, short)]
    pub db: Option<PathBuf>,

    /// Number of workers. Default: available parallelism.
    #[arg(long, short = 'w', value_parser = clap::value_parser!(usize))]
    pub workers: Option<usize>,

    /// Image processing backend.
    #[arg(long, short = 'p')]
    pub processor: Option<String>,

    /// Output formats (jpg, webp). Can specify multiple: -f jpg webp
    #[arg(long = "format", short = 'f', num_args = 1..)]
    pub formats: Vec<String>,

    /// Per-job resize deadline in seconds; 0 disables it.
    #[arg(long, value_parser = clap::value_parser!(u64))]
    pub resize_timeout: Option<u64>,

    /// Verbose output with progress bar.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}

impl BuildArgs {
    pub fn in_dir(&self) -> PathBuf {
        self.in_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(Defaults::IN_DIR))
    }
}

#[derive(Clone, Args)]
pub struct LookupArgs {
    /// Metadata store. Default: `metadata.db` in img-out.
    #[arg(long, short)]
    pub db: Option<PathBuf>,

    /// Source image name. Default: a random image.
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Variant width; omit for native width.
    #[arg(long, short = 'w', conflicts_with = "height")]
    pub width: Option<u32>,

    /// Variant height; omit for native height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Variant format.
    #[arg(long, short = 'f', default_value = "webp")]
    pub format: String,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}

impl LookupArgs {
    /// Get the database path, defaulting to package db filename in the default output directory.
    pub fn db_path(&self) -> PathBuf {
        self.db.clone().unwrap_or_else(|| {
            PathBuf::from(Defaults::OUT_DIR).join(PackagePaths::get().db_filename())
        })
    }
}

#[derive(Clone, Args)]
pub struct CheckArgs {
    /// Source image directory. Default: img-src.
    #[arg(long, short = 'i', default_value = Defaults::IN_DIR)]
    pub in_dir: PathBuf,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}
