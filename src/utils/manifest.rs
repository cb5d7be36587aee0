//! Manifest reader: `metadata.json` in the input directory maps each source filename to its
//! capture metadata.
//!
//! ```json
//! { "a.jpg": { "date": "2020-01", "location": "Paris" } }
//! ```
//!
//! Unknown fields are ignored. An entry may carry `main_color` to skip dominant-colour
//! extraction for that image.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ConfigError;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct ManifestEntry {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub main_color: Option<String>,
}

/// Source filename → capture metadata. Ordered so job emission is reproducible.
pub type Manifest = BTreeMap<String, ManifestEntry>;

/// Parse a manifest from a JSON string. `origin` is only used in error messages.
pub fn parse_manifest(json: &str, origin: &Path) -> Result<Manifest, ConfigError> {
    serde_json::from_str(json).map_err(|source| ConfigError::Json {
        path: origin.to_path_buf(),
        source,
    })
}

/// Load the manifest file. Missing or malformed is fatal.
pub fn load_manifest(path: &Path) -> Result<Manifest, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let manifest = parse_manifest(&s, path)?;
    log::debug!("{}: {} manifest entries", path.display(), manifest.len());
    Ok(manifest)
}

/// Keep only the entries named in `only` (all entries when `only` is empty).
/// A name absent from the manifest is a configuration error.
pub fn select_entries(manifest: Manifest, only: &[String]) -> Result<Manifest, ConfigError> {
    if only.is_empty() {
        return Ok(manifest);
    }
    let mut manifest = manifest;
    let mut selected = Manifest::new();
    for name in only {
        let entry = manifest
            .remove(name)
            .ok_or_else(|| ConfigError::NotInManifest(name.clone()))?;
        selected.insert(name.clone(), entry);
    }
    Ok(selected)
}
