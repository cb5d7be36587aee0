//! Metadata store: schema, open (fresh / read-only / in-memory), inserts and best-variant lookup.
//!
//! A `rusqlite::Connection` is `Send` but not `Sync`, so whoever owns it is the single
//! writer. During a build that is the result collector.

mod connection;
mod store;

pub use connection::{
    open_store, open_store_fresh, open_store_in_memory, open_store_read_only, remove_store_files,
};
pub use store::{
    add_source_image, add_variant, find_best_variant, list_source_images, source_image_count,
    variant_count, variants_for,
};

/// WAL tuning pragmas (synchronous, autocheckpoint, size limit). Use after PRAGMA journal_mode = WAL.
pub(crate) const WAL_PRAGMAS: &str = r#"
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 10000;
        PRAGMA journal_size_limit = 67108864;
        "#;

/// Per-connection pragma; SQLite does not enforce REFERENCES without it.
pub(crate) const FOREIGN_KEYS_ON: &str = "PRAGMA foreign_keys = ON;";

pub(crate) const INSERT_SOURCE_IMAGE_SQL: &str = "INSERT INTO source_image (name, capture_date, location, dominant_color) VALUES (?1, ?2, ?3, ?4)";

pub(crate) const INSERT_VARIANT_SQL: &str = "INSERT INTO generated_variant (filename, source_image_name, width, height, format) VALUES (?1, ?2, ?3, ?4, ?5)";

/// Exact match on format and both dimensions (`IS` so NULL matches NULL). With no name,
/// one source image is drawn at random and the match is made within it.
pub(crate) const FIND_BEST_VARIANT_SQL: &str = r#"
SELECT v.filename, i.name, i.capture_date, i.location, i.dominant_color,
       v.width, v.height, v.format
FROM generated_variant v
JOIN source_image i ON i.name = v.source_image_name
WHERE v.format = ?1
  AND v.width IS ?2
  AND v.height IS ?3
  AND i.name = COALESCE(?4, (SELECT name FROM source_image ORDER BY RANDOM() LIMIT 1))
LIMIT 1
"#;

/// Schema for source_image and generated_variant tables.
pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS source_image (
    name TEXT PRIMARY KEY NOT NULL,
    capture_date TEXT NOT NULL,
    location TEXT NOT NULL,
    dominant_color TEXT NOT NULL
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS generated_variant (
    filename TEXT PRIMARY KEY NOT NULL,
    source_image_name TEXT NOT NULL REFERENCES source_image(name),
    width INTEGER CHECK (width IS NULL OR width > 0),
    height INTEGER CHECK (height IS NULL OR height > 0),
    format TEXT NOT NULL,
    CHECK (width IS NULL OR height IS NULL)
);
CREATE INDEX IF NOT EXISTS idx_variant_lookup
    ON generated_variant(source_image_name, format, width, height);
"#;
