//! Load `.imgen.toml` from the input directory (CLI only). Library callers build [`Opts`] directly.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::transform::ProcessorKind;
use crate::utils::config::PackagePaths;
use crate::{OutputFormat, Opts};

#[derive(Debug, Default, Deserialize)]
pub struct ImgenToml {
    #[serde(default)]
    settings: BuildSection,
}

#[derive(Debug, Default, Deserialize)]
struct BuildSection {
    out_dir: Option<String>,
    breakpoints: Option<String>,
    db_path: Option<String>,
    workers: Option<usize>,
    processor: Option<String>,
    formats: Option<Vec<String>>,
    resize_timeout_secs: Option<u64>,
    verbose: Option<bool>,
}

pub fn parse_imgen_toml(s: &str, origin: &Path) -> Result<ImgenToml, ConfigError> {
    toml::from_str(s).map_err(|source| ConfigError::Toml {
        path: origin.to_path_buf(),
        source,
    })
}

/// Load `.imgen.toml` from `dir`. `Ok(None)` when the file does not exist; a file that
/// exists but does not parse is an error.
pub fn load_imgen_toml(dir: &Path) -> Result<Option<ImgenToml>, ConfigError> {
    let path = dir.join(PackagePaths::get().config_filename());
    if !path.is_file() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    log::debug!("Using config file {}", path.display());
    parse_imgen_toml(&s, &path).map(Some)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($section:expr, $opts:expr, $field:ident => $opts_field:ident) => {
        if let Some(v) = $section.$field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI flags.
pub fn apply_file_to_opts(file: &ImgenToml, opts: &mut Opts) -> Result<(), ConfigError> {
    let s = &file.settings;
    if let Some(ref p) = s.out_dir {
        opts.out_dir = PathBuf::from(p);
    }
    if let Some(ref p) = s.breakpoints {
        opts.breakpoints_path = PathBuf::from(p);
    }
    if let Some(ref p) = s.db_path {
        opts.db_path = Some(PathBuf::from(p));
    }
    if let Some(n) = s.workers {
        opts.workers = Some(n);
    }
    if let Some(ref name) = s.processor {
        opts.processor = name.parse::<ProcessorKind>()?;
    }
    if let Some(ref names) = s.formats {
        opts.formats = names
            .iter()
            .map(|n| n.parse::<OutputFormat>())
            .collect::<Result<Vec<_>, _>>()?;
    }
    apply_file_opt!(s, opts, resize_timeout_secs => resize_timeout_secs);
    apply_file_opt!(s, opts, verbose => verbose);
    Ok(())
}
