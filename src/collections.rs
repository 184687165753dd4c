// src/collections.rs
//! Saved-post collections ("folders") and the cleanup cascade around them.
//!
//! Invariants kept here:
//! - a post inside a collection is always in its owner's saved list;
//! - a collection with zero posts does not survive a cleanup pass;
//! - the user's collection id list only references collections that exist.

use anyhow::Result;

use crate::models::{Collection, Id, Post, User};
use crate::store::Store;
use serde::Serialize;

/// Cover shown for folders whose posts all disappeared mid-request.
pub const EMPTY_FOLDER_COVER: &str = "/img/empty-folder.jpg";

#[derive(Debug, Clone)]
pub enum SaveTarget {
    Existing(Id),
    New(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Unsaved,
    /// Save requested without naming a folder; nothing to do.
    Ignored,
}

/// Toggle the saved state of `post_id` for `user`.
///
/// Saving files the post into an existing or freshly created collection and
/// into the user's saved list, and promotes the post's image to the folder
/// cover. Unsaving runs the full cascade: pull from the saved list, pull
/// from every collection, drop collections left empty, resync the user's
/// collection ids. The mutated `user` is persisted before returning.
pub async fn toggle_save(
    store: &dyn Store,
    user: &mut User,
    post_id: &str,
    target: Option<SaveTarget>,
) -> Result<SaveOutcome> {
    if user.saved_posts.iter().any(|id| id == post_id) {
        unsave_cascade(store, user, post_id).await?;
        store.put_user(user.clone()).await?;
        return Ok(SaveOutcome::Unsaved);
    }

    let collection_id = match target {
        Some(SaveTarget::New(name)) => {
            let mut collection = Collection::new(name, user.id.clone());
            collection.posts.push(post_id.to_string());
            let id = collection.id.clone();
            store.put_collection(collection).await?;
            id
        }
        Some(SaveTarget::Existing(id)) => {
            let Some(mut collection) = store.collection(&id).await? else {
                return Ok(SaveOutcome::Ignored);
            };
            if !collection.posts.iter().any(|p| p == post_id) {
                collection.posts.push(post_id.to_string());
            }
            store.put_collection(collection).await?;
            id
        }
        None => return Ok(SaveOutcome::Ignored),
    };

    user.saved_posts.push(post_id.to_string());
    if !user.collections.contains(&collection_id) {
        user.collections.push(collection_id.clone());
    }
    store.put_user(user.clone()).await?;

    // Latest saved post's image becomes the folder cover.
    if let Some(Post {
        image: Some(image), ..
    }) = store.post(post_id).await?
    {
        if let Some(mut collection) = store.collection(&collection_id).await? {
            collection.cover_image = image;
            store.put_collection(collection).await?;
        }
    }

    Ok(SaveOutcome::Saved)
}

/// Remove `post_id` from the user's saved list and every collection,
/// deleting collections that end up empty. Returns how many were deleted.
/// Does not persist `user`; callers do that once they are done mutating.
pub async fn unsave_cascade(store: &dyn Store, user: &mut User, post_id: &str) -> Result<usize> {
    user.saved_posts.retain(|id| id != post_id);

    let mut deleted = 0;
    for collection_id in user.collections.clone() {
        let Some(mut collection) = store.collection(&collection_id).await? else {
            continue;
        };
        collection.posts.retain(|id| id != post_id);
        if collection.posts.is_empty() {
            store.delete_collection(&collection_id).await?;
            deleted += 1;
        } else {
            store.put_collection(collection).await?;
        }
    }

    if deleted > 0 {
        sync_collection_ids(store, user).await?;
    }
    Ok(deleted)
}

/// Dashboard sync pass: drop the user's empty collections and reconcile
/// the id list on the profile. Returns how many collections were deleted.
pub async fn prune_empty(store: &dyn Store, user: &mut User) -> Result<usize> {
    let mut deleted = 0;
    for collection in store.collections_for(&user.id).await? {
        if collection.posts.is_empty() {
            store.delete_collection(&collection.id).await?;
            deleted += 1;
        }
    }
    sync_collection_ids(store, user).await?;
    store.put_user(user.clone()).await?;
    Ok(deleted)
}

/// Keep only collection ids that still resolve to a stored collection.
async fn sync_collection_ids(store: &dyn Store, user: &mut User) -> Result<()> {
    let mut kept = Vec::with_capacity(user.collections.len());
    for id in &user.collections {
        if store.collection(id).await?.is_some() {
            kept.push(id.clone());
        }
    }
    user.collections = kept;
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    pub id: Id,
    pub name: String,
    pub post_count: usize,
    pub cover_image: String,
}

/// Folder previews for the dashboard.
pub async fn summaries(store: &dyn Store, user_id: &str) -> Result<Vec<CollectionSummary>> {
    let collections = store.collections_for(user_id).await?;
    Ok(collections
        .into_iter()
        .map(|c| {
            let cover = if c.cover_image.is_empty() {
                EMPTY_FOLDER_COVER.to_string()
            } else {
                c.cover_image
            };
            CollectionSummary {
                id: c.id,
                name: c.name,
                post_count: c.posts.len(),
                cover_image: cover,
            }
        })
        .collect())
}

/// Post-deletion cascade: remove a dead post id from every user's saved
/// list and collections (with the usual empty-folder cleanup).
pub async fn purge_post(store: &dyn Store, post_id: &str) -> Result<()> {
    for mut user in store.users().await? {
        if user.saved_posts.iter().any(|id| id == post_id) {
            unsave_cascade(store, &mut user, post_id).await?;
            store.put_user(user).await?;
        }
    }
    Ok(())
}
