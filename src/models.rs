// src/models.rs
//! Document types as stored by the persistence layer. These mirror the
//! collections of the original document database, minus concerns this
//! service does not own (sessions, uploads, messaging).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::interest::InterestModel;
use crate::tags;

pub type Id = String;

pub fn new_id() -> Id {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
    Owner,
}

impl Role {
    /// Admins and the owner may edit or delete other users' posts.
    pub fn can_moderate(self) -> bool {
        matches!(self, Role::Admin | Role::Owner)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub role: Role,
    /// Lenient-loaded: corrupt legacy payloads repair to an empty model.
    #[serde(default)]
    pub interests: InterestModel,
    #[serde(default)]
    pub liked_posts: Vec<Id>,
    #[serde(default)]
    pub saved_posts: Vec<Id>,
    #[serde(default)]
    pub collections: Vec<Id>,
    #[serde(default)]
    pub followers: Vec<Id>,
    #[serde(default)]
    pub following: Vec<Id>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            email: email.into(),
            nickname: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            image: None,
            role: Role::default(),
            interests: InterestModel::new(),
            liked_posts: Vec::new(),
            saved_posts: Vec::new(),
            collections: Vec::new(),
            followers: Vec::new(),
            following: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub user: Id,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Id,
    pub slug: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub image: Option<String>,
    /// Canonicalized on the way in; tolerant of array, comma-string, or
    /// absent wire shapes.
    #[serde(default, deserialize_with = "tags::deserialize")]
    pub tags: Vec<String>,
    /// Author id.
    pub user: Id,
    #[serde(default)]
    pub likes: Vec<Id>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        slug: impl Into<String>,
        author: impl Into<Id>,
        tags: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            slug: slug.into(),
            title: title.into(),
            body: body.into(),
            image: None,
            tags,
            user: author.into(),
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: Id,
    pub name: String,
    /// Owner id.
    pub user: Id,
    #[serde(default)]
    pub posts: Vec<Id>,
    /// Image of the most recently added post.
    #[serde(default)]
    pub cover_image: String,
    pub created_at: DateTime<Utc>,
}

impl Collection {
    pub fn new(name: impl Into<String>, owner: impl Into<Id>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            user: owner.into(),
            posts: Vec::new(),
            cover_image: String::new(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Follow,
    Like,
    Comment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Id,
    pub recipient: Id,
    pub sender: Id,
    pub kind: NotificationKind,
    #[serde(default)]
    pub post: Option<Id>,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(recipient: impl Into<Id>, sender: impl Into<Id>, kind: NotificationKind) -> Self {
        Self {
            id: new_id(),
            recipient: recipient.into(),
            sender: sender.into(),
            kind,
            post: None,
            read: false,
            created_at: Utc::now(),
        }
    }

    pub fn about_post(mut self, post: impl Into<Id>) -> Self {
        self.post = Some(post.into());
        self
    }
}
