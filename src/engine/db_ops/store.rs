//! Store operations: append rows, best-variant lookup, counts.

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{StoreError, StoreResult};
use crate::types::{GeneratedVariant, SourceImage, VariantMatch};

use super::{FIND_BEST_VARIANT_SQL, INSERT_SOURCE_IMAGE_SQL, INSERT_VARIANT_SQL};

/// Insert one source image row. Fails on a duplicate `name`.
pub fn add_source_image(conn: &Connection, image: &SourceImage) -> StoreResult<()> {
    let mut stmt = conn.prepare_cached(INSERT_SOURCE_IMAGE_SQL)?;
    stmt.execute(params![
        image.name,
        image.capture_date,
        image.location,
        image.dominant_color
    ])?;
    Ok(())
}

/// Insert one variant row. Fails on a duplicate `filename`, an unknown source image,
/// both axes set, or a zero dimension.
pub fn add_variant(conn: &Connection, variant: &GeneratedVariant) -> StoreResult<()> {
    let invalid = |reason| StoreError::InvalidVariant {
        filename: variant.filename.clone(),
        reason,
    };
    if variant.width.is_some() && variant.height.is_some() {
        return Err(invalid("width and height are both set"));
    }
    if variant.width == Some(0) || variant.height == Some(0) {
        return Err(invalid("dimensions must be positive"));
    }

    let mut stmt = conn.prepare_cached(INSERT_VARIANT_SQL)?;
    stmt.execute(params![
        variant.filename,
        variant.source_image_name,
        variant.width,
        variant.height,
        variant.format
    ])?;
    Ok(())
}

/// Exactly one variant matching `format`, `width` and `height` (None matches NULL), joined
/// with its source image. With `name` None a random source image is picked first.
/// `StoreError::NotFound` when nothing matches.
pub fn find_best_variant(
    conn: &Connection,
    name: Option<&str>,
    width: Option<u32>,
    height: Option<u32>,
    format: &str,
) -> StoreResult<VariantMatch> {
    let mut stmt = conn.prepare_cached(FIND_BEST_VARIANT_SQL)?;
    let found = stmt
        .query_row(params![format, width, height, name], |row| {
            Ok(VariantMatch {
                filename: row.get(0)?,
                name: row.get(1)?,
                capture_date: row.get(2)?,
                location: row.get(3)?,
                dominant_color: row.get(4)?,
                width: row.get(5)?,
                height: row.get(6)?,
                format: row.get(7)?,
            })
        })
        .optional()?;
    found.ok_or(StoreError::NotFound)
}

pub fn source_image_count(conn: &Connection) -> StoreResult<usize> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM source_image", [], |row| row.get(0))?;
    Ok(n.max(0) as usize)
}

pub fn variant_count(conn: &Connection) -> StoreResult<usize> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM generated_variant", [], |row| {
        row.get(0)
    })?;
    Ok(n.max(0) as usize)
}

/// All variants of one source image, ordered by filename.
pub fn variants_for(conn: &Connection, source_name: &str) -> StoreResult<Vec<GeneratedVariant>> {
    let mut stmt = conn.prepare(
        "SELECT filename, source_image_name, width, height, format FROM generated_variant \
         WHERE source_image_name = ?1 ORDER BY filename",
    )?;
    let rows = stmt.query_map([source_name], |row| {
        Ok(GeneratedVariant {
            filename: row.get(0)?,
            source_image_name: row.get(1)?,
            width: row.get(2)?,
            height: row.get(3)?,
            format: row.get(4)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Every registered source image, ordered by name.
pub fn list_source_images(conn: &Connection) -> StoreResult<Vec<SourceImage>> {
    let mut stmt = conn.prepare(
        "SELECT name, capture_date, location, dominant_color FROM source_image ORDER BY name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(SourceImage {
            name: row.get(0)?,
            capture_date: row.get(1)?,
            location: row.get(2)?,
            dominant_color: row.get(3)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
