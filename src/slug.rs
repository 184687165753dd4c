// src/slug.rs
//! URL slugs for posts: lowercase title, uniqueness guaranteed by an
//! existence-check loop against the store (`title`, `title-2`, `title-3`…).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::store::Store;

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("slug regex"));

/// Lowercase, collapse non-alphanumeric runs to `-`, trim. Titles that
/// normalize to nothing fall back to `"post"`.
pub fn slugify(title: &str) -> String {
    let lower = title.to_lowercase();
    let slug = NON_ALNUM.replace_all(&lower, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "post".to_string()
    } else {
        slug.to_string()
    }
}

/// First free slug derived from `title`.
pub async fn unique_slug(store: &dyn Store, title: &str) -> anyhow::Result<String> {
    let base = slugify(title);
    if !store.slug_exists(&base).await? {
        return Ok(base);
    }
    let mut n: u64 = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if !store.slug_exists(&candidate).await? {
            return Ok(candidate);
        }
        n += 1;
    }
}
