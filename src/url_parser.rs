//! Accept Drive share links wherever an entry id is expected.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{DriveError, Result};

/// Share link shapes, each capturing the id as `id`.
static LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://drive\.google\.com/(?:drive/(?:u/\d+/)?folders/|file/d/|open\?id=)(?P<id>[A-Za-z0-9_-]+)",
    )
    .expect("Invalid share link regex")
});

static ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("Invalid ID regex"));

/// Resolve a folder/file link or a bare id to the id.
///
/// ```
/// use drive_reconcile::url_parser::extract_id;
///
/// assert_eq!(extract_id("https://drive.google.com/drive/folders/1abc").unwrap(), "1abc");
/// assert_eq!(extract_id("1abc").unwrap(), "1abc");
/// ```
pub fn extract_id(url_or_id: &str) -> Result<String> {
    let trimmed = url_or_id.trim();

    if let Some(id) = LINK_REGEX.captures(trimmed).and_then(|c| c.name("id")) {
        return Ok(id.as_str().to_string());
    }
    if ID_REGEX.is_match(trimmed) {
        return Ok(trimmed.to_string());
    }

    Err(DriveError::InvalidUrlOrId(url_or_id.to_string()))
}
