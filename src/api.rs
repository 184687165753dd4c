// src/api.rs
//! HTTP surface. Handlers stay thin: resolve the viewer, call into the
//! pure core and store ops, map outcomes to JSON. The viewer id arrives in
//! the `X-User-Id` header from the session layer in front of this service;
//! a missing header means an anonymous request.

use metrics::counter;
use serde::{Deserialize, Serialize};
use shuttle_axum::axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::{debug, warn};

use crate::collections::{self, CollectionSummary, SaveOutcome, SaveTarget};
use crate::config::ConfigHandle;
use crate::error::ApiError;
use crate::feed;
use crate::models::{Collection, Comment, Notification, NotificationKind, Post, Role, User};
use crate::search;
use crate::sitemap;
use crate::slug;
use crate::social::{self, FollowStatus};
use crate::store::SharedStore;

pub const VIEWER_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub config: ConfigHandle,
}

impl AppState {
    pub fn new(store: SharedStore, config: ConfigHandle) -> Self {
        Self { store, config }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/feed", get(get_feed))
        .route("/following", get(get_following_feed))
        .route("/dashboard", get(get_dashboard))
        .route("/search", get(get_search))
        .route("/sitemap.xml", get(get_sitemap))
        .route("/posts", post(create_post))
        .route("/posts/mine", get(get_my_posts))
        .route("/posts/{slug}", get(get_post))
        .route("/posts/edit/{id}", post(edit_post))
        .route("/posts/delete/{id}", post(delete_post))
        .route("/posts/like/{id}", post(like_post))
        .route("/posts/comment/{id}", post(comment_post))
        .route("/collections/save", post(save_collection))
        .route("/collections/{id}", get(get_collection))
        .route("/users/suggestions", get(get_suggestions))
        .route("/users/{id}/followers", get(get_followers))
        .route("/users/{id}/following", get(get_following_list))
        .route("/follow/{id}", post(follow_user))
        .route("/followers/remove/{id}", post(remove_follower))
        .route("/notifications", get(get_notifications))
        .route("/notifications/read-all", post(read_all_notifications))
        .route("/notifications/clear", post(clear_notifications))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Short anonymized fingerprint for identities in logs; never log raw ids.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

async fn viewer(state: &AppState, headers: &HeaderMap) -> Result<Option<User>, ApiError> {
    let Some(id) = headers.get(VIEWER_HEADER).and_then(|v| v.to_str().ok()) else {
        return Ok(None);
    };
    Ok(state.store.user(id).await?)
}

async fn require_viewer(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    viewer(state, headers).await?.ok_or(ApiError::Unauthorized)
}

/* ----------------------------
Feeds
---------------------------- */

async fn get_feed(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Post>>, ApiError> {
    let viewer = viewer(&state, &headers).await?;
    let mut posts = state.store.posts().await?;
    feed::rank(&mut posts, viewer.as_ref().map(|u| &u.interests));

    counter!("feed_requests_total").increment(1);
    if let Some(u) = &viewer {
        debug!(viewer = %anon_hash(&u.id), posts = posts.len(), "feed ranked");
    }
    Ok(Json(posts))
}

async fn get_following_feed(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Post>>, ApiError> {
    let viewer = require_viewer(&state, &headers).await?;
    let mut posts: Vec<Post> = state
        .store
        .posts()
        .await?
        .into_iter()
        .filter(|p| viewer.following.contains(&p.user))
        .collect();
    // The dedicated following page is purely chronological.
    feed::rank(&mut posts, None);
    Ok(Json(posts))
}

/* ----------------------------
Posts
---------------------------- */

#[derive(Deserialize)]
struct CreatePostReq {
    title: String,
    body: String,
    /// Form shape: whitespace-separated, optional `@` prefixes.
    #[serde(default)]
    tags: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreatePostReq>,
) -> Result<Json<Post>, ApiError> {
    let viewer = require_viewer(&state, &headers).await?;
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".into()));
    }

    let tags = req
        .tags
        .as_deref()
        .map(crate::tags::from_form)
        .unwrap_or_default();
    let slug = slug::unique_slug(state.store.as_ref(), &req.title).await?;

    let mut post = Post::new(req.title.trim(), req.body, slug, viewer.id, tags);
    post.image = req.image;
    state.store.put_post(post.clone()).await?;

    counter!("posts_created_total").increment(1);
    Ok(Json(post))
}

#[derive(Serialize)]
struct PostView {
    post: Post,
    is_liked: bool,
    is_saved: bool,
}

/// Post detail. A view by an identified user bumps their interest score
/// for every tag on the post; a failed persist of that update is logged
/// and counted but never blocks the render.
async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<Json<PostView>, ApiError> {
    let Some(post) = state.store.post_by_slug(&slug).await? else {
        return Err(ApiError::NotFound);
    };

    let mut is_liked = false;
    let mut is_saved = false;

    if let Some(mut user) = viewer(&state, &headers).await? {
        is_liked = post.likes.contains(&user.id);
        is_saved = user.saved_posts.contains(&post.id);

        if !post.tags.is_empty() {
            let increment = state.config.snapshot().interest_increment;
            user.interests.record_view(&post.tags, increment);
            counter!("interest_updates_total").increment(1);

            let viewer_id = user.id.clone();
            if let Err(err) = state.store.put_user(user).await {
                counter!("interest_update_failures_total").increment(1);
                warn!(viewer = %anon_hash(&viewer_id), error = %err, "interest update not persisted");
            }
        }
    }

    Ok(Json(PostView {
        post,
        is_liked,
        is_saved,
    }))
}

#[derive(Deserialize)]
struct EditPostReq {
    title: String,
    body: String,
    #[serde(default)]
    tags: Option<String>,
}

async fn edit_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<EditPostReq>,
) -> Result<Json<Post>, ApiError> {
    let viewer = require_viewer(&state, &headers).await?;
    let Some(mut post) = state.store.post(&id).await? else {
        return Err(ApiError::NotFound);
    };
    if post.user != viewer.id && !viewer.role.can_moderate() {
        return Err(ApiError::Forbidden);
    }
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".into()));
    }

    post.title = req.title;
    post.body = req.body;
    post.tags = req
        .tags
        .as_deref()
        .map(crate::tags::from_form)
        .unwrap_or_default();
    post.updated_at = chrono::Utc::now();

    state.store.put_post(post.clone()).await?;
    Ok(Json(post))
}

async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let viewer = require_viewer(&state, &headers).await?;
    let Some(post) = state.store.post(&id).await? else {
        return Err(ApiError::NotFound);
    };
    if post.user != viewer.id && !viewer.role.can_moderate() {
        return Err(ApiError::Forbidden);
    }

    // Saved lists and collections first, then the post itself.
    collections::purge_post(state.store.as_ref(), &id).await?;
    state.store.delete_post(&id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn get_my_posts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Post>>, ApiError> {
    let viewer = require_viewer(&state, &headers).await?;
    let mut posts: Vec<Post> = state
        .store
        .posts()
        .await?
        .into_iter()
        .filter(|p| p.user == viewer.id)
        .collect();
    feed::rank(&mut posts, None);
    Ok(Json(posts))
}

#[derive(Serialize)]
struct LikeResponse {
    liked: bool,
    likes: usize,
}

async fn like_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<LikeResponse>, ApiError> {
    let mut viewer = require_viewer(&state, &headers).await?;
    let Some(mut post) = state.store.post(&id).await? else {
        return Err(ApiError::NotFound);
    };

    let already = post.likes.contains(&viewer.id);
    if already {
        post.likes.retain(|uid| uid != &viewer.id);
        viewer.liked_posts.retain(|pid| pid != &id);
    } else {
        post.likes.push(viewer.id.clone());
        viewer.liked_posts.push(id.clone());
        if post.user != viewer.id {
            state
                .store
                .push_notification(
                    Notification::new(&post.user, &viewer.id, NotificationKind::Like)
                        .about_post(id.clone()),
                )
                .await?;
        }
    }

    let likes = post.likes.len();
    state.store.put_post(post).await?;
    state.store.put_user(viewer).await?;
    Ok(Json(LikeResponse {
        liked: !already,
        likes,
    }))
}

#[derive(Deserialize)]
struct CommentReq {
    text: String,
}

async fn comment_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CommentReq>,
) -> Result<Json<Post>, ApiError> {
    let viewer = require_viewer(&state, &headers).await?;
    if req.text.trim().is_empty() {
        return Err(ApiError::BadRequest("comment must not be empty".into()));
    }
    let Some(mut post) = state.store.post(&id).await? else {
        return Err(ApiError::NotFound);
    };

    post.comments.push(Comment {
        user: viewer.id.clone(),
        text: req.text,
        created_at: chrono::Utc::now(),
    });
    state.store.put_post(post.clone()).await?;

    if post.user != viewer.id {
        state
            .store
            .push_notification(
                Notification::new(&post.user, &viewer.id, NotificationKind::Comment).about_post(id),
            )
            .await?;
    }
    Ok(Json(post))
}

/* ----------------------------
Collections
---------------------------- */

#[derive(Deserialize)]
struct SaveReq {
    post_id: String,
    #[serde(default)]
    collection_id: Option<String>,
    #[serde(default)]
    new_collection_name: Option<String>,
}

#[derive(Serialize)]
struct SaveResponse {
    status: &'static str,
}

async fn save_collection(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SaveReq>,
) -> Result<Json<SaveResponse>, ApiError> {
    let mut viewer = require_viewer(&state, &headers).await?;
    if state.store.post(&req.post_id).await?.is_none() {
        return Err(ApiError::NotFound);
    }

    // A new-folder name wins over an existing folder id, matching the form.
    let target = if let Some(name) = req.new_collection_name.filter(|n| !n.trim().is_empty()) {
        Some(SaveTarget::New(name))
    } else {
        req.collection_id.map(SaveTarget::Existing)
    };

    let outcome =
        collections::toggle_save(state.store.as_ref(), &mut viewer, &req.post_id, target).await?;
    let status = match outcome {
        SaveOutcome::Saved => "saved",
        SaveOutcome::Unsaved => "unsaved",
        SaveOutcome::Ignored => "ignored",
    };
    Ok(Json(SaveResponse { status }))
}

#[derive(Serialize)]
struct CollectionView {
    collection: Collection,
    posts: Vec<Post>,
}

async fn get_collection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CollectionView>, ApiError> {
    let Some(collection) = state.store.collection(&id).await? else {
        return Err(ApiError::NotFound);
    };
    let mut posts = Vec::with_capacity(collection.posts.len());
    for post_id in &collection.posts {
        // Posts deleted since saving are simply skipped.
        if let Some(post) = state.store.post(post_id).await? {
            posts.push(post);
        }
    }
    Ok(Json(CollectionView { collection, posts }))
}

/* ----------------------------
Dashboard
---------------------------- */

#[derive(Serialize)]
struct UserBrief {
    id: String,
    name: String,
    nickname: String,
    role: Role,
}

impl From<&User> for UserBrief {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            name: u.name.clone(),
            nickname: u.nickname.clone(),
            role: u.role,
        }
    }
}

#[derive(Serialize)]
struct DashboardView {
    user: User,
    liked_posts: Vec<Post>,
    collections: Vec<CollectionSummary>,
    suggestions: Vec<UserBrief>,
}

async fn get_dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DashboardView>, ApiError> {
    let mut viewer = require_viewer(&state, &headers).await?;

    // Empty-folder cleanup runs on every dashboard load.
    collections::prune_empty(state.store.as_ref(), &mut viewer).await?;

    let mut liked_posts = Vec::new();
    for post_id in &viewer.liked_posts {
        if let Some(post) = state.store.post(post_id).await? {
            liked_posts.push(post);
        }
    }

    let summaries = collections::summaries(state.store.as_ref(), &viewer.id).await?;
    let limit = state.config.snapshot().suggestions_limit;
    let suggestions = social::suggestions(state.store.as_ref(), &viewer, limit).await?;

    Ok(Json(DashboardView {
        liked_posts,
        collections: summaries,
        suggestions: suggestions.iter().map(UserBrief::from).collect(),
        user: viewer,
    }))
}

/* ----------------------------
Follow graph
---------------------------- */

#[derive(Serialize)]
struct FollowResponse {
    status: &'static str,
}

async fn follow_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<FollowResponse>, ApiError> {
    let viewer = require_viewer(&state, &headers).await?;
    if viewer.id == id {
        return Err(ApiError::BadRequest("cannot follow yourself".into()));
    }
    if state.store.user(&id).await?.is_none() {
        return Err(ApiError::NotFound);
    }

    let status = match social::toggle_follow(state.store.as_ref(), &viewer.id, &id).await? {
        FollowStatus::Following => "following",
        FollowStatus::Unfollowed => "unfollowed",
    };
    Ok(Json(FollowResponse { status }))
}

async fn remove_follower(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<FollowResponse>, ApiError> {
    let viewer = require_viewer(&state, &headers).await?;
    social::remove_follower(state.store.as_ref(), &viewer.id, &id).await?;
    Ok(Json(FollowResponse { status: "removed" }))
}

async fn get_followers(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<UserBrief>>, ApiError> {
    let Some(target) = state.store.user(&id).await? else {
        return Err(ApiError::NotFound);
    };
    Ok(Json(resolve_briefs(&state, &target.followers).await?))
}

async fn get_following_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<UserBrief>>, ApiError> {
    let Some(target) = state.store.user(&id).await? else {
        return Err(ApiError::NotFound);
    };
    Ok(Json(resolve_briefs(&state, &target.following).await?))
}

async fn resolve_briefs(state: &AppState, ids: &[String]) -> Result<Vec<UserBrief>, ApiError> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(user) = state.store.user(id).await? {
            out.push(UserBrief::from(&user));
        }
    }
    Ok(out)
}

async fn get_suggestions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<UserBrief>>, ApiError> {
    let viewer = require_viewer(&state, &headers).await?;
    let limit = state.config.snapshot().suggestions_limit;
    let picks = social::suggestions(state.store.as_ref(), &viewer, limit).await?;
    Ok(Json(picks.iter().map(UserBrief::from).collect()))
}

/* ----------------------------
Notifications
---------------------------- */

async fn get_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let viewer = require_viewer(&state, &headers).await?;
    Ok(Json(state.store.notifications_for(&viewer.id).await?))
}

async fn read_all_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let viewer = require_viewer(&state, &headers).await?;
    state.store.mark_notifications_read(&viewer.id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn clear_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let viewer = require_viewer(&state, &headers).await?;
    state.store.clear_notifications(&viewer.id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/* ----------------------------
Search & sitemap
---------------------------- */

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn get_search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Result<Json<search::SearchResults>, ApiError> {
    let viewer = viewer(&state, &headers).await?;
    let limits = state.config.snapshot().search;
    let results = search::hybrid(state.store.as_ref(), viewer.as_ref(), &query.q, &limits).await?;
    counter!("search_queries_total").increment(1);
    Ok(Json(results))
}

async fn get_sitemap(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let posts = state.store.posts().await?;
    let base_url = state.config.snapshot().base_url;
    let xml = sitemap::render(&base_url, &posts)?;
    Ok(([(header::CONTENT_TYPE, "application/xml")], xml))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anon_hash_is_short_and_stable() {
        let a = anon_hash("user-1");
        let b = anon_hash("user-1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
        assert_ne!(a, anon_hash("user-2"));
    }
}
