// 🔑 Identifier Normalizer - Canonical keys for registry ids
// The scraper writes numeric ids through pandas, so the same dog shows up
// as "82433" in one file and "82433.0" in another. Every boundary that reads
// an external id (import, lookup maps, cross-reference resolution) must go
// through `normalize_id` or the two spellings never match.

use std::path::Path;

/// Default web path that scraped images are served from
pub const DEFAULT_IMAGE_PREFIX: &str = "/dog-images/";

/// Marker the scraper leaves in local image paths
const SCRAPER_IMAGE_DIR: &str = "output/images/";

// ============================================================================
// EXTERNAL IDS
// ============================================================================

/// Canonicalize a raw external id.
///
/// Trims whitespace and strips any trailing "." + zeros suffix left by
/// float serialization. Empty input (after trimming) is `None`.
///
/// ```
/// use berner_registry::ids::normalize_id;
/// assert_eq!(normalize_id(Some("123.0")), Some("123".to_string()));
/// assert_eq!(normalize_id(Some(" 45 ")), Some("45".to_string()));
/// assert_eq!(normalize_id(Some("")), None);
/// assert_eq!(normalize_id(None), None);
/// ```
pub fn normalize_id(raw: Option<&str>) -> Option<String> {
    let mut id = raw?.trim();

    // Loop so "7.0.0" and "7.0" land on the same key (keeps this idempotent)
    while let Some(stripped) = strip_zero_suffix(id) {
        id = stripped.trim_end();
    }

    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Returns the id without its ".0", ".00", ... suffix, if it has one
fn strip_zero_suffix(id: &str) -> Option<&str> {
    let without_zeros = id.trim_end_matches('0');
    if without_zeros.len() == id.len() {
        return None;
    }
    without_zeros.strip_suffix('.')
}

/// Split a pipe-delimited id list ("10|20.0|30") into normalized ids.
/// Empty segments are dropped.
pub fn split_id_list(raw: &str) -> Vec<String> {
    raw.split('|')
        .filter_map(|part| normalize_id(Some(part)))
        .collect()
}

/// Registry dog/person ids are numeric; anything else in an id list is noise
pub fn is_numeric_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_digit())
}

// ============================================================================
// NAMES
// ============================================================================

/// Key used for the litter→dog name fallback: trimmed + uppercased.
pub fn normalize_name(raw: Option<&str>) -> Option<String> {
    let name = raw?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_uppercase())
    }
}

/// Scraper placeholders that mean "no value"
pub fn is_sentinel(value: &str) -> bool {
    matches!(value.trim(), "" | "None" | "null" | "nan" | "NaN")
}

// ============================================================================
// IMAGES
// ============================================================================

/// Rewrite a scraper-local image path to a web-servable one.
///
/// Any path containing `output/images/` becomes `prefix + basename`;
/// other paths (already-public URLs) pass through untouched.
pub fn convert_image_path(path: Option<&str>, prefix: &str) -> Option<String> {
    let path = path?.trim();
    if path.is_empty() {
        return None;
    }

    if path.contains(SCRAPER_IMAGE_DIR) {
        let base = Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(path);
        return Some(format!("{}{}", prefix, base));
    }

    Some(path.to_string())
}

// ============================================================================
// TESTS
// ============================================================================
