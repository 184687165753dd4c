// tests/collections_flow.rs
//
// Save/unsave over HTTP plus the cleanup cascades: emptied folders are
// deleted, the dashboard reconciles the profile, and deleting a post
// purges it from every saver.

use std::sync::Arc;

use serde_json::{json, Value as Json};
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _;

use interest_feed::api::{self, AppState, VIEWER_HEADER};
use interest_feed::config::{ConfigHandle, FeedConfig};
use interest_feed::models::{Post, User};
use interest_feed::store::{MemoryStore, Store};

const BODY_LIMIT: usize = 1024 * 1024;

fn test_router(store: Arc<MemoryStore>) -> Router {
    let state = AppState::new(store, ConfigHandle::new(FeedConfig::default()));
    api::create_router(state)
}

async fn read_json(resp: shuttle_axum::axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    serde_json::from_slice(&bytes).expect("parse json body")
}

async fn post_json(store: Arc<MemoryStore>, uri: &str, viewer: &str, payload: Json) -> Json {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(VIEWER_HEADER, viewer)
        .body(Body::from(payload.to_string()))
        .expect("build request");

    let resp = test_router(store).oneshot(req).await.expect("oneshot");
    assert!(resp.status().is_success(), "{uri} got {}", resp.status());
    read_json(resp).await
}

async fn seed(store: &MemoryStore) -> (User, Post) {
    let user = User::new("Ada", "ada@example.com");
    let post = Post::new("Hello", "body", "hello", "author", vec![]);
    store.put_user(user.clone()).await.unwrap();
    store.put_post(post.clone()).await.unwrap();
    (user, post)
}

#[tokio::test]
async fn save_toggle_roundtrip_cleans_up_the_folder() {
    let store = Arc::new(MemoryStore::new());
    let (user, post) = seed(&store).await;

    let v = post_json(
        store.clone(),
        "/collections/save",
        &user.id,
        json!({ "post_id": post.id, "new_collection_name": "reading" }),
    )
    .await;
    assert_eq!(v["status"], "saved");

    let saved = store.user(&user.id).await.unwrap().unwrap();
    assert_eq!(saved.saved_posts, vec![post.id.clone()]);
    assert_eq!(saved.collections.len(), 1);
    let collection_id = saved.collections[0].clone();

    // Second toggle unsaves and deletes the now-empty folder.
    let v = post_json(
        store.clone(),
        "/collections/save",
        &user.id,
        json!({ "post_id": post.id }),
    )
    .await;
    assert_eq!(v["status"], "unsaved");

    let after = store.user(&user.id).await.unwrap().unwrap();
    assert!(after.saved_posts.is_empty());
    assert!(after.collections.is_empty());
    assert!(store.collection(&collection_id).await.unwrap().is_none());
}

#[tokio::test]
async fn save_without_folder_is_ignored() {
    let store = Arc::new(MemoryStore::new());
    let (user, post) = seed(&store).await;

    let v = post_json(
        store.clone(),
        "/collections/save",
        &user.id,
        json!({ "post_id": post.id }),
    )
    .await;
    assert_eq!(v["status"], "ignored");
    let after = store.user(&user.id).await.unwrap().unwrap();
    assert!(after.saved_posts.is_empty());
}

#[tokio::test]
async fn dashboard_reports_folder_summaries() {
    let store = Arc::new(MemoryStore::new());
    let (user, post) = seed(&store).await;

    post_json(
        store.clone(),
        "/collections/save",
        &user.id,
        json!({ "post_id": post.id, "new_collection_name": "reading" }),
    )
    .await;

    let req = Request::builder()
        .method("GET")
        .uri("/dashboard")
        .header(VIEWER_HEADER, &user.id)
        .body(Body::empty())
        .expect("build GET /dashboard");
    let resp = test_router(store)
        .oneshot(req)
        .await
        .expect("oneshot /dashboard");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    let folders = v["collections"].as_array().expect("collections array");
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0]["name"], "reading");
    assert_eq!(folders[0]["post_count"], 1);
}

#[tokio::test]
async fn deleting_a_post_purges_it_from_savers() {
    let store = Arc::new(MemoryStore::new());
    let (ada, _) = seed(&store).await;

    // Bob authors a post, Ada saves it, Bob deletes it.
    let bob = User::new("Bob", "bob@example.com");
    store.put_user(bob.clone()).await.unwrap();
    let post = Post::new("Mine", "body", "mine", bob.id.clone(), vec![]);
    store.put_post(post.clone()).await.unwrap();

    post_json(
        store.clone(),
        "/collections/save",
        &ada.id,
        json!({ "post_id": post.id, "new_collection_name": "stash" }),
    )
    .await;

    let v = post_json(
        store.clone(),
        &format!("/posts/delete/{}", post.id),
        &bob.id,
        json!({}),
    )
    .await;
    assert_eq!(v["deleted"], true);

    assert!(store.post(&post.id).await.unwrap().is_none());
    let ada_after = store.user(&ada.id).await.unwrap().unwrap();
    assert!(ada_after.saved_posts.is_empty());
    assert!(ada_after.collections.is_empty());
}

#[tokio::test]
async fn only_author_or_moderator_may_delete() {
    let store = Arc::new(MemoryStore::new());
    let (ada, post) = seed(&store).await;

    // Ada is not the author ("author" is) and not a moderator.
    let req = Request::builder()
        .method("POST")
        .uri(format!("/posts/delete/{}", post.id))
        .header("content-type", "application/json")
        .header(VIEWER_HEADER, &ada.id)
        .body(Body::from("{}"))
        .expect("build POST delete");
    let resp = test_router(store).oneshot(req).await.expect("oneshot");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
