//! Persistence seams. Handlers and services only see these traits; the
//! Postgres implementation lives in [`postgres`].

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::authz::Role;

#[cfg(test)]
pub mod memory;
pub mod postgres;
pub mod repo_types;

pub use repo_types::*;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate value violates {0}")]
    Conflict(String),
    #[error("db error")]
    Db(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(dbe) = &e {
            if dbe.code().as_deref() == Some("23505") {
                let constraint = dbe.constraint().unwrap_or("unique constraint").to_string();
                return StoreError::Conflict(constraint);
            }
        }
        StoreError::Db(e)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create_user(&self, new: NewUser) -> StoreResult<User>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> StoreResult<Option<User>>;
    /// Compare-and-set: moves `from -> to` only while the stored role is still
    /// `from`. `None` when the user is gone or holds another role.
    async fn set_role(&self, id: Uuid, from: Role, to: Role) -> StoreResult<Option<User>>;
    /// Deletes the user with everything hanging off it in one transaction:
    /// their comments (and backlinks), their blogs (and those blogs' comments)
    /// and their entries in like sets. Nothing is deleted unless the locked
    /// row still holds `expected`.
    async fn purge_user(&self, id: Uuid, expected: Role) -> StoreResult<PurgeOutcome>;
}

#[async_trait]
pub trait BlogRepo: Send + Sync {
    /// Case-insensitive title lookup, optionally ignoring one blog.
    async fn title_taken(&self, title: &str, except: Option<Uuid>) -> StoreResult<bool>;
    async fn slug_taken(&self, slug: &str) -> StoreResult<bool>;
    async fn create_blog(&self, new: NewBlog) -> StoreResult<Blog>;
    async fn find_blog(&self, id: Uuid) -> StoreResult<Option<Blog>>;
    async fn find_blog_by_slug(&self, slug: &str) -> StoreResult<Option<Blog>>;
    /// Newest first.
    async fn list_blogs(&self, filter: &BlogFilter) -> StoreResult<Vec<Blog>>;
    /// Ignores `limit` and `offset`.
    async fn count_blogs(&self, filter: &BlogFilter) -> StoreResult<i64>;
    async fn update_blog(&self, id: Uuid, changes: BlogChanges) -> StoreResult<Option<Blog>>;
    /// Deletes the blog and its comments in one transaction.
    async fn delete_blog(&self, id: Uuid) -> StoreResult<Option<Blog>>;
    /// Atomic `views + 1`; returns the new count.
    async fn increment_views(&self, id: Uuid) -> StoreResult<Option<i64>>;
    /// Atomic symmetric difference of the like set with `{user_id}`.
    async fn toggle_like(&self, id: Uuid, user_id: Uuid) -> StoreResult<Option<LikeState>>;
}

#[async_trait]
pub trait CommentRepo: Send + Sync {
    /// Inserts the record and appends the backlink; `None` if the blog is gone.
    async fn add_comment(
        &self,
        blog_id: Uuid,
        user_id: Uuid,
        body: &str,
    ) -> StoreResult<Option<Comment>>;
    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>>;
    /// In backlink order.
    async fn list_comments(&self, blog_id: Uuid) -> StoreResult<Vec<CommentView>>;
    async fn remove_comment(&self, blog_id: Uuid, comment_id: Uuid) -> StoreResult<CommentRemoval>;
}

pub trait Store: UserRepo + BlogRepo + CommentRepo {}

impl<T: UserRepo + BlogRepo + CommentRepo> Store for T {}
