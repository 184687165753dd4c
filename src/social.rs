// src/social.rs
//! Follow graph: instant follow/unfollow toggles, follower removal, and
//! "who to follow" suggestions. Follow events produce notifications.

use anyhow::{anyhow, Result};

use crate::models::{Notification, NotificationKind, Role, User};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowStatus {
    Following,
    Unfollowed,
}

/// Toggle `self_id` following `target_id`, keeping both adjacency lists in
/// step. A new follow notifies the target. Callers reject self-follows
/// before getting here.
pub async fn toggle_follow(store: &dyn Store, self_id: &str, target_id: &str) -> Result<FollowStatus> {
    let mut me = store
        .user(self_id)
        .await?
        .ok_or_else(|| anyhow!("unknown user {self_id}"))?;
    let mut target = store
        .user(target_id)
        .await?
        .ok_or_else(|| anyhow!("unknown user {target_id}"))?;

    let already = target.followers.iter().any(|id| id == self_id);
    if already {
        target.followers.retain(|id| id != self_id);
        me.following.retain(|id| id != target_id);
        store.put_user(target).await?;
        store.put_user(me).await?;
        return Ok(FollowStatus::Unfollowed);
    }

    if !me.following.iter().any(|id| id == target_id) {
        me.following.push(target_id.to_string());
    }
    target.followers.push(self_id.to_string());
    store.put_user(target).await?;
    store.put_user(me).await?;
    store
        .push_notification(Notification::new(target_id, self_id, NotificationKind::Follow))
        .await?;
    Ok(FollowStatus::Following)
}

/// Drop `follower_id` from my followers (and me from their following).
pub async fn remove_follower(store: &dyn Store, my_id: &str, follower_id: &str) -> Result<()> {
    if let Some(mut follower) = store.user(follower_id).await? {
        follower.following.retain(|id| id != my_id);
        store.put_user(follower).await?;
    }
    if let Some(mut me) = store.user(my_id).await? {
        me.followers.retain(|id| id != follower_id);
        store.put_user(me).await?;
    }
    Ok(())
}

/// Up to `limit` accounts worth following: not the viewer, not already
/// followed, never the owner account. Newest accounts first so the list is
/// deterministic.
pub async fn suggestions(store: &dyn Store, viewer: &User, limit: usize) -> Result<Vec<User>> {
    let mut candidates: Vec<User> = store
        .users()
        .await?
        .into_iter()
        .filter(|u| {
            u.id != viewer.id && u.role != Role::Owner && !viewer.following.contains(&u.id)
        })
        .collect();
    candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    candidates.truncate(limit);
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    async fn two_users(store: &MemoryStore) -> (User, User) {
        let a = User::new("Ada", "ada@example.com");
        let b = User::new("Bob", "bob@example.com");
        store.put_user(a.clone()).await.unwrap();
        store.put_user(b.clone()).await.unwrap();
        (a, b)
    }

    #[tokio::test]
    async fn follow_updates_both_sides_and_notifies() {
        let store = MemoryStore::new();
        let (a, b) = two_users(&store).await;

        let status = toggle_follow(&store, &a.id, &b.id).await.unwrap();
        assert_eq!(status, FollowStatus::Following);

        let a2 = store.user(&a.id).await.unwrap().unwrap();
        let b2 = store.user(&b.id).await.unwrap().unwrap();
        assert!(a2.following.contains(&b.id));
        assert!(b2.followers.contains(&a.id));

        let notes = store.notifications_for(&b.id).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::Follow);
        assert_eq!(notes[0].sender, a.id);
    }

    #[tokio::test]
    async fn second_toggle_unfollows_without_new_notification() {
        let store = MemoryStore::new();
        let (a, b) = two_users(&store).await;

        toggle_follow(&store, &a.id, &b.id).await.unwrap();
        let status = toggle_follow(&store, &a.id, &b.id).await.unwrap();
        assert_eq!(status, FollowStatus::Unfollowed);

        let a2 = store.user(&a.id).await.unwrap().unwrap();
        let b2 = store.user(&b.id).await.unwrap().unwrap();
        assert!(a2.following.is_empty());
        assert!(b2.followers.is_empty());
        assert_eq!(store.notifications_for(&b.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_follower_cleans_both_directions() {
        let store = MemoryStore::new();
        let (a, b) = two_users(&store).await;
        toggle_follow(&store, &a.id, &b.id).await.unwrap();

        remove_follower(&store, &b.id, &a.id).await.unwrap();

        let a2 = store.user(&a.id).await.unwrap().unwrap();
        let b2 = store.user(&b.id).await.unwrap().unwrap();
        assert!(a2.following.is_empty());
        assert!(b2.followers.is_empty());
    }

    #[tokio::test]
    async fn suggestions_skip_self_followed_and_owner() {
        let store = MemoryStore::new();
        let (a, b) = two_users(&store).await;
        let mut owner = User::new("Root", "root@example.com");
        owner.role = Role::Owner;
        store.put_user(owner).await.unwrap();
        let c = User::new("Cleo", "cleo@example.com");
        store.put_user(c.clone()).await.unwrap();

        toggle_follow(&store, &a.id, &b.id).await.unwrap();
        let viewer = store.user(&a.id).await.unwrap().unwrap();
        let picks = suggestions(&store, &viewer, 6).await.unwrap();

        let ids: Vec<&str> = picks.iter().map(|u| u.id.as_str()).collect();
        assert!(ids.contains(&c.id.as_str()));
        assert!(!ids.contains(&a.id.as_str()));
        assert!(!ids.contains(&b.id.as_str()));
        assert_eq!(picks.iter().filter(|u| u.role == Role::Owner).count(), 0);
    }
}
