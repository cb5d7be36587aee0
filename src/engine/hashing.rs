//! Content hashing and output filename derivation.

use crate::types::OutputFormat;
use crate::utils::config::CONTENT_HASH_HEX_LEN;

use super::tools::strip_extension;

/// 32-bit content hash of encoded bytes: the leading four bytes of the blake3 digest.
/// Only used to make cache-busting filenames; not a security boundary.
pub fn content_hash(bytes: &[u8]) -> u32 {
    let digest = blake3::hash(bytes);
    let b = digest.as_bytes();
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

/// [`content_hash`] as fixed-width lowercase hex.
pub fn content_hash_hex(bytes: &[u8]) -> String {
    format!("{:0width$x}", content_hash(bytes), width = CONTENT_HASH_HEX_LEN)
}

/// Dimension suffix: `_h<H>`, `_w<W>` or empty for native resolution.
pub fn dimension_suffix(width: u32, height: u32) -> String {
    if height != 0 {
        format!("_h{height}")
    } else if width != 0 {
        format!("_w{width}")
    } else {
        String::new()
    }
}

/// Output filename: `{base}{_h<H>|_w<W>|}_{format}_{hash}.{ext}`.
pub fn variant_filename(
    source_name: &str,
    width: u32,
    height: u32,
    format: OutputFormat,
    hash_hex: &str,
) -> String {
    format!(
        "{}{}_{}_{}.{}",
        strip_extension(source_name),
        dimension_suffix(width, height),
        format.name(),
        hash_hex,
        format.ext()
    )
}

/// Hash `encoded` and derive its output filename in one step.
pub fn variant_filename_for(
    source_name: &str,
    width: u32,
    height: u32,
    format: OutputFormat,
    encoded: &[u8],
) -> String {
    variant_filename(
        source_name,
        width,
        height,
        format,
        &content_hash_hex(encoded),
    )
}
