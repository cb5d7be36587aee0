//! Breakpoint config: `{"heights": [..], "widths": [..]}`.

use log::warn;
use serde::Deserialize;
use std::path::Path;

use crate::error::ConfigError;

/// Target dimensions a variant is generated at, one axis per variant.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Breakpoints {
    #[serde(default)]
    pub heights: Vec<u32>,
    #[serde(default)]
    pub widths: Vec<u32>,
}

impl Breakpoints {
    /// Reject zero values: a zero dimension means "native" and is emitted separately.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heights.contains(&0) {
            return Err(ConfigError::ZeroBreakpoint("heights"));
        }
        if self.widths.contains(&0) {
            return Err(ConfigError::ZeroBreakpoint("widths"));
        }
        Ok(())
    }

    /// Drop repeated values, keeping first-seen order. Two equal breakpoints would plan two
    /// jobs writing the same file.
    pub fn dedup(&mut self) {
        for (axis, values) in [("heights", &mut self.heights), ("widths", &mut self.widths)] {
            let before = values.len();
            let mut seen = Vec::with_capacity(before);
            values.retain(|v| {
                if seen.contains(v) {
                    false
                } else {
                    seen.push(*v);
                    true
                }
            });
            if values.len() != before {
                warn!(
                    "breakpoints: dropped {} repeated {} value(s)",
                    before - values.len(),
                    axis
                );
            }
        }
    }

    /// Number of resized (non-native) variants per source image and format.
    pub fn len(&self) -> usize {
        self.heights.len() + self.widths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn parse_breakpoints(json: &str, origin: &Path) -> Result<Breakpoints, ConfigError> {
    let mut bp: Breakpoints = serde_json::from_str(json).map_err(|source| ConfigError::Json {
        path: origin.to_path_buf(),
        source,
    })?;
    bp.validate()?;
    bp.dedup();
    Ok(bp)
}

/// Load the breakpoints file. Missing or unparseable is fatal.
pub fn load_breakpoints(path: &Path) -> Result<Breakpoints, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_breakpoints(&s, path)
}
