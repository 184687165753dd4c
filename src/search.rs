// src/search.rs
//! Hybrid search: users and posts in one query. Substring matching is
//! case-insensitive; nicknames additionally tolerate near spellings via
//! Jaro-Winkler so a typo'd handle still finds its account.

use anyhow::Result;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::HashSet;

use crate::config::SearchLimits;
use crate::models::{Post, User};
use crate::store::Store;

/// Similarity floor for fuzzy nickname hits.
const NICKNAME_SIMILARITY: f64 = 0.88;

#[derive(Debug, Clone, Serialize)]
pub struct UserHit {
    pub id: String,
    pub name: String,
    pub nickname: String,
    pub image: Option<String>,
    pub is_following: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub users: Vec<UserHit>,
    pub posts: Vec<Post>,
}

/// Search users (name, nickname) and posts (title, body, tags, author).
/// The viewer is excluded from user hits; a blank query yields nothing.
pub async fn hybrid(
    store: &dyn Store,
    viewer: Option<&User>,
    query: &str,
    limits: &SearchLimits,
) -> Result<SearchResults> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(SearchResults::default());
    }

    let pattern = contains_pattern(query);
    let query_lower = query.to_lowercase();
    let viewer_id = viewer.map(|u| u.id.as_str());

    let mut users: Vec<User> = store
        .users()
        .await?
        .into_iter()
        .filter(|u| Some(u.id.as_str()) != viewer_id)
        .filter(|u| {
            pattern.is_match(&u.name)
                || pattern.is_match(&u.nickname)
                || (!u.nickname.is_empty()
                    && strsim::jaro_winkler(&u.nickname.to_lowercase(), &query_lower)
                        >= NICKNAME_SIMILARITY)
        })
        .collect();
    users.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    users.truncate(limits.users);

    // Owner match: posts by authors whose name/nickname matches too.
    let author_ids: HashSet<String> = store
        .users()
        .await?
        .into_iter()
        .filter(|u| pattern.is_match(&u.name) || pattern.is_match(&u.nickname))
        .map(|u| u.id)
        .collect();

    let mut posts: Vec<Post> = store
        .posts()
        .await?
        .into_iter()
        .filter(|p| {
            pattern.is_match(&p.title)
                || pattern.is_match(&p.body)
                || p.tags.iter().any(|t| pattern.is_match(t))
                || author_ids.contains(&p.user)
        })
        .collect();
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    posts.truncate(limits.posts);

    let following: HashSet<&String> = viewer.map(|u| u.following.iter().collect()).unwrap_or_default();
    let users = users
        .into_iter()
        .map(|u| UserHit {
            is_following: following.contains(&u.id),
            id: u.id,
            name: u.name,
            nickname: u.nickname,
            image: u.image,
        })
        .collect();

    Ok(SearchResults { users, posts })
}

/// Case-insensitive "contains" matcher with the query escaped verbatim.
fn contains_pattern(query: &str) -> Regex {
    RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
        .expect("escaped query is a valid pattern")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn limits() -> SearchLimits {
        SearchLimits::default()
    }

    async fn seed(store: &MemoryStore) -> (User, User) {
        let mut ada = User::new("Ada Lovelace", "ada@example.com");
        ada.nickname = "countess".into();
        let mut bob = User::new("Bob Brown", "bob@example.com");
        bob.nickname = "bobby".into();
        store.put_user(ada.clone()).await.unwrap();
        store.put_user(bob.clone()).await.unwrap();

        let post = Post::new(
            "Go generics in practice",
            "Notes from the field",
            "go-generics",
            ada.id.clone(),
            vec!["go".into()],
        );
        store.put_post(post).await.unwrap();
        (ada, bob)
    }

    #[tokio::test]
    async fn blank_query_returns_nothing() {
        let store = MemoryStore::new();
        seed(&store).await;
        let results = hybrid(&store, None, "   ", &limits()).await.unwrap();
        assert!(results.users.is_empty());
        assert!(results.posts.is_empty());
    }

    #[tokio::test]
    async fn substring_match_is_case_insensitive() {
        let store = MemoryStore::new();
        let (ada, _) = seed(&store).await;

        let results = hybrid(&store, None, "LOVELACE", &limits()).await.unwrap();
        assert_eq!(results.users.len(), 1);
        assert_eq!(results.users[0].id, ada.id);
        // Author match pulls in her post as well.
        assert_eq!(results.posts.len(), 1);
    }

    #[tokio::test]
    async fn viewer_is_excluded_and_follow_state_reported() {
        let store = MemoryStore::new();
        let (ada, mut bob) = seed(&store).await;
        bob.following.push(ada.id.clone());
        store.put_user(bob.clone()).await.unwrap();

        let results = hybrid(&store, Some(&bob), "o", &limits()).await.unwrap();
        assert!(results.users.iter().all(|u| u.id != bob.id));
        let hit = results.users.iter().find(|u| u.id == ada.id).unwrap();
        assert!(hit.is_following);
    }

    #[tokio::test]
    async fn fuzzy_nickname_tolerates_typos() {
        let store = MemoryStore::new();
        let (ada, _) = seed(&store).await;
        let results = hybrid(&store, None, "countes", &limits()).await.unwrap();
        assert!(results.users.iter().any(|u| u.id == ada.id));
    }

    #[tokio::test]
    async fn posts_match_on_tags_and_title() {
        let store = MemoryStore::new();
        seed(&store).await;

        let by_tag = hybrid(&store, None, "go", &limits()).await.unwrap();
        assert_eq!(by_tag.posts.len(), 1);

        let by_title = hybrid(&store, None, "generics", &limits()).await.unwrap();
        assert_eq!(by_title.posts.len(), 1);

        let none = hybrid(&store, None, "quantum", &limits()).await.unwrap();
        assert!(none.posts.is_empty());
    }

    #[tokio::test]
    async fn regex_metacharacters_are_matched_literally() {
        let store = MemoryStore::new();
        seed(&store).await;
        // Must not panic or match everything.
        let results = hybrid(&store, None, "a+b(c", &limits()).await.unwrap();
        assert!(results.posts.is_empty());
        assert!(results.users.is_empty());
    }
}
