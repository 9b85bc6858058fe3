//! Deterministic content identifiers
//!
//! Every cached article is keyed by a short digest of the topic title that was
//! requested, so concurrent fetches of the same topic converge on one row.

use sha2::{Digest, Sha256};

/// Number of hex characters kept from the SHA-256 digest
pub const CONTENT_ID_LEN: usize = 16;

/// Derive the content id for a topic title.
///
/// Surrounding whitespace is ignored; everything else, including case, is
/// significant.
pub fn derive_content_id(title: &str) -> String {
    let digest = Sha256::digest(title.trim().as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(CONTENT_ID_LEN);
    id
}
