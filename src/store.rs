// src/store.rs
//! Persistence boundary. The service treats the document store as an
//! external collaborator: every call is an async suspension point, values
//! are fetched fresh per request, and writes are whole-document
//! (read-modify-write, last-write-wins between racing requests).
//!
//! `MemoryStore` is the in-process implementation used by the binary and
//! the test suite.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::{Collection, Id, Notification, Post, User};

pub type SharedStore = Arc<dyn Store>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn user(&self, id: &str) -> Result<Option<User>>;
    async fn users(&self) -> Result<Vec<User>>;
    async fn put_user(&self, user: User) -> Result<()>;

    async fn post(&self, id: &str) -> Result<Option<Post>>;
    async fn post_by_slug(&self, slug: &str) -> Result<Option<Post>>;
    async fn posts(&self) -> Result<Vec<Post>>;
    async fn put_post(&self, post: Post) -> Result<()>;
    async fn delete_post(&self, id: &str) -> Result<()>;
    async fn slug_exists(&self, slug: &str) -> Result<bool>;

    async fn collection(&self, id: &str) -> Result<Option<Collection>>;
    async fn collections_for(&self, user_id: &str) -> Result<Vec<Collection>>;
    async fn put_collection(&self, collection: Collection) -> Result<()>;
    async fn delete_collection(&self, id: &str) -> Result<()>;

    /// Newest first.
    async fn notifications_for(&self, user_id: &str) -> Result<Vec<Notification>>;
    async fn push_notification(&self, notification: Notification) -> Result<()>;
    async fn mark_notifications_read(&self, user_id: &str) -> Result<()>;
    async fn clear_notifications(&self, user_id: &str) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Id, User>>,
    posts: RwLock<HashMap<Id, Post>>,
    collections: RwLock<HashMap<Id, Collection>>,
    notifications: RwLock<Vec<Notification>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fault injection: make every write fail. Reads stay up, which is
    /// exactly the degraded mode the feed must survive.
    pub fn set_fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("store write failed (injected)");
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn users(&self) -> Result<Vec<User>> {
        Ok(self.users.read().await.values().cloned().collect())
    }

    async fn put_user(&self, user: User) -> Result<()> {
        self.check_writable()?;
        self.users.write().await.insert(user.id.clone(), user);
        Ok(())
    }

    async fn post(&self, id: &str) -> Result<Option<Post>> {
        Ok(self.posts.read().await.get(id).cloned())
    }

    async fn post_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        Ok(self
            .posts
            .read()
            .await
            .values()
            .find(|p| p.slug == slug)
            .cloned())
    }

    async fn posts(&self) -> Result<Vec<Post>> {
        Ok(self.posts.read().await.values().cloned().collect())
    }

    async fn put_post(&self, post: Post) -> Result<()> {
        self.check_writable()?;
        self.posts.write().await.insert(post.id.clone(), post);
        Ok(())
    }

    async fn delete_post(&self, id: &str) -> Result<()> {
        self.check_writable()?;
        self.posts.write().await.remove(id);
        Ok(())
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool> {
        Ok(self.posts.read().await.values().any(|p| p.slug == slug))
    }

    async fn collection(&self, id: &str) -> Result<Option<Collection>> {
        Ok(self.collections.read().await.get(id).cloned())
    }

    async fn collections_for(&self, user_id: &str) -> Result<Vec<Collection>> {
        let mut out: Vec<Collection> = self
            .collections
            .read()
            .await
            .values()
            .filter(|c| c.user == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn put_collection(&self, collection: Collection) -> Result<()> {
        self.check_writable()?;
        self.collections
            .write()
            .await
            .insert(collection.id.clone(), collection);
        Ok(())
    }

    async fn delete_collection(&self, id: &str) -> Result<()> {
        self.check_writable()?;
        self.collections.write().await.remove(id);
        Ok(())
    }

    async fn notifications_for(&self, user_id: &str) -> Result<Vec<Notification>> {
        let mut out: Vec<Notification> = self
            .notifications
            .read()
            .await
            .iter()
            .filter(|n| n.recipient == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn push_notification(&self, notification: Notification) -> Result<()> {
        self.check_writable()?;
        self.notifications.write().await.push(notification);
        Ok(())
    }

    async fn mark_notifications_read(&self, user_id: &str) -> Result<()> {
        self.check_writable()?;
        for n in self.notifications.write().await.iter_mut() {
            if n.recipient == user_id {
                n.read = true;
            }
        }
        Ok(())
    }

    async fn clear_notifications(&self, user_id: &str) -> Result<()> {
        self.check_writable()?;
        self.notifications
            .write()
            .await
            .retain(|n| n.recipient != user_id);
        Ok(())
    }
}
