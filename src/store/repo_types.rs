use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::authz::{Role, Subject};
use crate::blogs::category::Category;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,                   // lowercased, unique
    pub password_hash: String,           // Argon2 PHC string
    pub role: Role,
    pub display_picture: Option<String>, // object key
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn subject(&self) -> Subject {
        Subject { id: self.id, role: self.role }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Blog {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub category: Category,
    pub blog_image: Option<String>, // object key
    pub author_id: Uuid,
    pub comment_ids: Vec<Uuid>,
    pub views: i64,
    pub likes: Vec<Uuid>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub comment: String,
    pub blog_id: Uuid,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
}

/// Comment joined with its author's public fields.
#[derive(Debug, Clone, FromRow)]
pub struct CommentView {
    pub id: Uuid,
    pub comment: String,
    pub user_id: Uuid,
    pub username: String,
    pub display_picture: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub display_picture: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewBlog {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub category: Category,
    pub blog_image: Option<String>,
    pub author_id: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct BlogChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub blog_image: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BlogFilter {
    pub search: Option<String>,
    pub category: Option<Category>,
    pub author_id: Option<Uuid>,
    pub limit: Option<i64>, // None = no limit
    pub offset: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub likes: i64,
}

/// Outcome of removing a comment together with its backlink in the parent blog.
/// Only `Removed` changes anything.
#[derive(Debug, Clone)]
pub enum CommentRemoval {
    Removed(Comment),
    /// The record exists but the blog does not reference it.
    BacklinkMissing,
    /// The blog references it but there is no record.
    RecordMissing,
    /// Neither side knows the comment.
    Absent,
}

/// Result of [`UserRepo::purge_user`](super::UserRepo::purge_user).
#[derive(Debug, Clone)]
pub enum PurgeOutcome {
    Purged(UserPurge),
    /// The account's role changed since it was checked; nothing was deleted.
    RoleChanged(Role),
    Missing,
}

/// What a user deletion left behind for object storage.
#[derive(Debug, Clone)]
pub struct UserPurge {
    pub user: User,
    pub deleted_blogs: usize,
    pub released_images: Vec<String>,
}
