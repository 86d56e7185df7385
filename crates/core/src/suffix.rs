use sha2::{Digest, Sha256};

use crate::{Create, Document};

/// Every deployed schema is named `code@<suffix>`.
pub const SCHEMA_PREFIX: &str = "code@";

#[must_use]
pub fn schema_name(suffix: &str) -> String {
    format!("{SCHEMA_PREFIX}{suffix}")
}

/// Derives the content-hash suffix for a document: the first 6 bytes of a
/// SHA-256 over each declare's canonical form (document order, newline
/// terminated) followed by each create's raw body text with creates taken in
/// name order. Stable across runs and across file ordering for unchanged
/// content.
#[must_use]
pub fn derive_suffix(document: &Document) -> String {
    let mut hasher = Sha256::new();
    for declare in &document.declares {
        hasher.update(declare.canonical().as_bytes());
        hasher.update(b"\n");
    }

    let mut creates = document.creates.iter().collect::<Vec<_>>();
    creates.sort_by(|a, b| a.quoted_name.cmp(&b.quoted_name));
    for create in creates {
        update_create(&mut hasher, create);
    }

    let digest = hasher.finalize();
    let mut suffix = String::with_capacity(12);
    for byte in &digest[..6] {
        suffix.push_str(&format!("{byte:02x}"));
    }
    suffix
}

fn update_create(hasher: &mut Sha256, create: &Create) {
    for token in &create.body {
        hasher.update(token.raw.as_bytes());
    }
}
