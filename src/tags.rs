// src/tags.rs
//! Tag normalization at the ingestion boundary.
//!
//! Post tag fields arrive in three observed shapes: a proper array of strings,
//! a single comma-separated string, or absent/null. Everything downstream
//! (scoring, ranking, search) assumes the canonical shape produced here:
//! distinct, lowercase, trimmed tags in first-occurrence order.

use serde::{Deserialize, Deserializer};

/// Raw wire shapes a tag field has been seen in.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawTags {
    Many(Vec<String>),
    One(String),
    /// Anything else (null, numbers, mixed arrays). Treated as "no tags".
    Other(serde_json::Value),
}

/// Canonicalize a raw tag field. Never fails; malformed input yields an
/// empty sequence.
pub fn normalize(raw: &RawTags) -> Vec<String> {
    match raw {
        RawTags::Many(items) => clean(items.iter().map(String::as_str)),
        RawTags::One(s) => clean(s.split(',')),
        RawTags::Other(_) => Vec::new(),
    }
}

/// Parse the create/edit form shape: whitespace-separated tags with an
/// optional `@` prefix, e.g. `"@go @rust"`.
pub fn from_form(input: &str) -> Vec<String> {
    clean(input.split_whitespace().map(|t| t.trim_start_matches('@')))
}

/// Serde hook for post documents: accept any observed shape, store canonical.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = RawTags::deserialize(deserializer)?;
    Ok(normalize(&raw))
}

/// Lowercase + trim + drop empties + dedup, preserving first occurrence.
fn clean<'a>(parts: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in parts {
        let tag = part.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}
