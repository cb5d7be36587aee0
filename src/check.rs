//! Manifest vs. input directory consistency check.

use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::path::Path;
use walkdir::WalkDir;

use crate::engine::tools::{is_source_image, path_relative_to, path_to_manifest_key};
use crate::error::{PipelineError, PipelineResult};
use crate::utils::config::PackagePaths;
use crate::utils::{Colors, Manifest, load_manifest};

/// Differences between the manifest and the image files on disk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// Image files with no manifest entry.
    pub unlisted: Vec<String>,
    /// Manifest entries whose file is missing.
    pub missing: Vec<String>,
}

impl CheckReport {
    pub fn is_consistent(&self) -> bool {
        self.unlisted.is_empty() && self.missing.is_empty()
    }
}

/// Relative paths of every image file under `in_dir`, skipping hidden entries.
pub fn collect_source_files(in_dir: &Path) -> PipelineResult<BTreeSet<String>> {
    let mut files = BTreeSet::new();
    let walker = WalkDir::new(in_dir).into_iter().filter_entry(|e| {
        e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.')
    });
    for entry in walker {
        let entry = entry.map_err(|e| PipelineError::Io {
            path: e.path().unwrap_or(in_dir).to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() || !is_source_image(entry.path()) {
            continue;
        }
        if let Some(rel) = path_relative_to(entry.path(), in_dir) {
            files.insert(path_to_manifest_key(&rel));
        }
    }
    Ok(files)
}

/// Compare `manifest` to the files found under `in_dir`.
pub fn compare_manifest(manifest: &Manifest, files: &BTreeSet<String>) -> CheckReport {
    CheckReport {
        unlisted: files
            .iter()
            .filter(|f| !manifest.contains_key(*f))
            .cloned()
            .collect(),
        missing: manifest
            .keys()
            .filter(|k| !files.contains(*k))
            .cloned()
            .collect(),
    }
}

/// Load the manifest of `in_dir` and compare it to the directory contents.
pub fn check_dir(in_dir: &Path) -> PipelineResult<CheckReport> {
    let manifest_path = in_dir.join(PackagePaths::get().manifest_filename());
    let manifest = load_manifest(&manifest_path).map_err(PipelineError::from)?;
    let files = collect_source_files(in_dir)?;
    debug!(
        "{} files on disk, {} manifest entries",
        files.len(),
        manifest.len()
    );
    let report = compare_manifest(&manifest, &files);
    print_report(&report);
    Ok(report)
}

/// Print check summary
fn print_report(report: &CheckReport) {
    if report.is_consistent() {
        info!("Manifest and input directory agree.");
        return;
    }
    for name in &report.unlisted {
        warn!("not in manifest: {}", name);
    }
    for name in &report.missing {
        warn!("missing file: {}", name);
    }
    info!(
        "{} | {}",
        Colors::colorize(
            Colors::FAILED,
            &format!("Unlisted: {}", report.unlisted.len())
        ),
        Colors::colorize(Colors::FAILED, &format!("Missing: {}", report.missing.len()))
    );
}
