use sha2::{Digest, Sha256};
use url::Url;

const ID_PREFIX: &str = "azure";
const MAX_SEGMENT_LEN: usize = 20;
const HASH_LEN: usize = 16;

/// Derives the stable article id for a feed link.
///
/// `azure_{segment}_{hash}` where `segment` is the last non-empty path
/// segment restricted to `[A-Za-z0-9_-]` and cut to 20 characters, and
/// `hash` is the first 16 hex digits of the SHA-256 of the full link. Links
/// that do not parse, or have no usable path segment, become
/// `azure_article_{hash}`.
pub fn derive_id(link: &str) -> String {
    let hash = link_hash(link);

    match last_segment(link) {
        Some(segment) => format!("{ID_PREFIX}_{segment}_{hash}"),
        None => format!("{ID_PREFIX}_article_{hash}"),
    }
}

fn last_segment(link: &str) -> Option<String> {
    let parsed = Url::parse(link.trim()).ok()?;
    let raw = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;

    let sanitized: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .take(MAX_SEGMENT_LEN)
        .collect();

    if sanitized.chars().all(|c| c == '_') {
        None
    } else {
        Some(sanitized)
    }
}

fn link_hash(link: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(link.as_bytes());
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(HASH_LEN);
    digest
}
