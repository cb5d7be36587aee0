//! Path and filesystem utilities

use std::path::{Path, PathBuf};

/// Source name without its final extension (`a.b.jpg` → `a.b`). Directory components are kept.
pub fn strip_extension(name: &str) -> &str {
    let file_start = name.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0);
    match name[file_start..].rfind('.') {
        Some(0) | None => name,
        Some(dot) => &name[..file_start + dot],
    }
}

/// True for file extensions the pipeline treats as source images.
pub fn is_source_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            matches!(
                e.to_ascii_lowercase().as_str(),
                "jpg" | "jpeg" | "png" | "webp" | "gif" | "tif" | "tiff" | "bmp"
            )
        })
        .unwrap_or(false)
}

/// Convert absolute path to relative path from base
pub fn path_relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    path.strip_prefix(base).ok().map(|p| p.to_path_buf())
}

/// Relative path as a forward-slash string, the way manifest keys are written.
pub fn path_to_manifest_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// SQLite sidecar files for `db_path` (`-wal`, `-shm`, `-journal`).
pub fn sqlite_sidecars(db_path: &Path) -> Vec<PathBuf> {
    let file_name = db_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = db_path.parent().unwrap_or(Path::new("."));
    ["-wal", "-shm", "-journal"]
        .iter()
        .map(|suffix| parent.join(format!("{file_name}{suffix}")))
        .collect()
}
