// src/feed.rs
//! Feed ranker: a total order over posts for a given viewer.
//!
//! Two-key sort: summed tag affinity descending, then recency. Viewers
//! without a usable interest model get pure reverse-chronology. Ties that
//! survive both keys fall back to id ascending so identical inputs always
//! produce identical output.
//!
//! Keys are computed once per post (full scan + one sort, no indexes); the
//! feed is recomputed on every request and never cached.

use std::cmp::Reverse;

use crate::interest::InterestModel;
use crate::models::Post;

/// Summed affinity of the viewer for a post's tags; missing tags count 0.
pub fn relevance(model: &InterestModel, post: &Post) -> u64 {
    post.tags.iter().map(|tag| model.score(tag)).sum()
}

/// Order `posts` in place for a viewer. `None` (anonymous) and an empty
/// model both mean: skip relevance entirely, newest first.
pub fn rank(posts: &mut [Post], model: Option<&InterestModel>) {
    match model {
        Some(m) if !m.is_empty() => {
            posts.sort_by_cached_key(|p| {
                (Reverse(relevance(m, p)), Reverse(p.created_at), p.id.clone())
            });
        }
        _ => {
            posts.sort_by_cached_key(|p| (Reverse(p.created_at), p.id.clone()));
        }
    }
}
