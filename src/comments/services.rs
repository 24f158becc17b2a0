use tracing::{error, info};
use uuid::Uuid;

use crate::authz::{enforce, Action, Target};
use crate::error::AppError;
use crate::state::AppState;
use crate::store::{Comment, CommentRemoval, User};

pub async fn post_comment(
    state: &AppState,
    actor: &User,
    blog_id: Uuid,
    body: &str,
) -> Result<Comment, AppError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(AppError::validation("comment cannot be empty"));
    }
    let blog = state
        .store
        .find_blog(blog_id)
        .await?
        .ok_or(AppError::NotFound("blog"))?;
    enforce(actor.subject(), Target::comment(actor.id), Action::Create)?;

    let comment = state
        .store
        .add_comment(blog.id, actor.id, body)
        .await?
        .ok_or(AppError::NotFound("blog"))?;
    info!(comment_id = %comment.id, blog_id = %blog.id, user_id = %actor.id, "comment posted");
    Ok(comment)
}

/// Removes the comment record and the blog's backlink together. Serves both
/// the owner route and the admin route.
pub async fn delete_comment(
    state: &AppState,
    actor: &User,
    blog_id: Uuid,
    comment_id: Uuid,
) -> Result<Comment, AppError> {
    let blog = state
        .store
        .find_blog(blog_id)
        .await?
        .ok_or(AppError::NotFound("blog"))?;

    // a record that exists but hangs off another blog is not found here
    let owner = match state.store.find_comment(comment_id).await? {
        Some(c) if c.blog_id == blog.id => c.user_id,
        Some(_) => return Err(AppError::NotFound("comment")),
        None if blog.comment_ids.contains(&comment_id) => {
            return Err(integrity_error(blog.id, comment_id, "backlink without a comment record"));
        }
        None => return Err(AppError::NotFound("comment")),
    };
    enforce(actor.subject(), Target::comment(owner), Action::Delete)?;

    match state.store.remove_comment(blog.id, comment_id).await? {
        CommentRemoval::Removed(comment) => {
            info!(%comment_id, blog_id = %blog.id, actor_id = %actor.id, "comment deleted");
            Ok(comment)
        }
        CommentRemoval::BacklinkMissing => Err(integrity_error(
            blog.id,
            comment_id,
            "comment record without a backlink",
        )),
        CommentRemoval::RecordMissing => Err(integrity_error(
            blog.id,
            comment_id,
            "backlink without a comment record",
        )),
        CommentRemoval::Absent => Err(AppError::NotFound("comment")),
    }
}

fn integrity_error(blog_id: Uuid, comment_id: Uuid, what: &str) -> AppError {
    error!(%blog_id, %comment_id, "comment integrity violation: {what}");
    AppError::InvalidOperation(format!("comment {comment_id}: {what}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::{DenyReason, Role};
    use crate::testing::TestApp;

    #[tokio::test]
    async fn any_identity_comments() {
        let app = TestApp::new();
        let author = app.user("writer", Role::Author).await;
        let reader = app.user("reader", Role::User).await;
        let blog = app.blog(&author, "Open for discussion").await;

        let c = post_comment(&app.state, &reader, blog.id, "  thanks!  ").await.unwrap();
        assert_eq!(c.comment, "thanks!");
        let stored = app.state.store.find_blog(blog.id).await.unwrap().unwrap();
        assert_eq!(stored.comment_ids, vec![c.id]);

        let err = post_comment(&app.state, &reader, blog.id, "   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = post_comment(&app.state, &reader, Uuid::new_v4(), "hi").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("blog")));
    }

    #[tokio::test]
    async fn delete_removes_record_and_backlink() {
        let app = TestApp::new();
        let author = app.user("writer", Role::Author).await;
        let reader = app.user("reader", Role::User).await;
        let blog = app.blog(&author, "Open for discussion").await;
        let c = post_comment(&app.state, &reader, blog.id, "hello").await.unwrap();

        delete_comment(&app.state, &reader, blog.id, c.id).await.unwrap();
        assert!(app.state.store.find_comment(c.id).await.unwrap().is_none());
        let stored = app.state.store.find_blog(blog.id).await.unwrap().unwrap();
        assert!(!stored.comment_ids.contains(&c.id));
    }

    #[tokio::test]
    async fn only_owner_or_admin_deletes() {
        let app = TestApp::new();
        let author = app.user("writer", Role::Author).await;
        let reader = app.user("reader", Role::User).await;
        let admin = app.user("root", Role::Admin).await;
        let blog = app.blog(&author, "Open for discussion").await;
        let c = post_comment(&app.state, &reader, blog.id, "hello").await.unwrap();

        // the blog's author does not own the comment
        let err = delete_comment(&app.state, &author, blog.id, c.id).await.unwrap_err();
        assert!(matches!(err, AppError::Denied(DenyReason::NotOwner)));

        delete_comment(&app.state, &admin, blog.id, c.id).await.unwrap();
        assert_eq!(app.store.comment_count().await, 0);
    }

    #[tokio::test]
    async fn missing_backlink_is_an_invalid_operation() {
        let app = TestApp::new();
        let author = app.user("writer", Role::Author).await;
        let blog = app.blog(&author, "Open for discussion").await;
        let c = post_comment(&app.state, &author, blog.id, "hello").await.unwrap();
        app.store.detach_backlink(blog.id, c.id).await;

        let err = delete_comment(&app.state, &author, blog.id, c.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidOperation(_)));
        // nothing was repaired or removed
        assert!(app.state.store.find_comment(c.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn missing_record_is_an_invalid_operation() {
        let app = TestApp::new();
        let author = app.user("writer", Role::Author).await;
        let blog = app.blog(&author, "Open for discussion").await;
        let c = post_comment(&app.state, &author, blog.id, "hello").await.unwrap();
        app.store.drop_comment_record(c.id).await;

        let err = delete_comment(&app.state, &author, blog.id, c.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidOperation(_)));
        let stored = app.state.store.find_blog(blog.id).await.unwrap().unwrap();
        assert_eq!(stored.comment_ids, vec![c.id]);
    }

    #[tokio::test]
    async fn comment_of_another_blog_is_not_found() {
        let app = TestApp::new();
        let author = app.user("writer", Role::Author).await;
        let first = app.blog(&author, "First discussion").await;
        let second = app.blog(&author, "Second discussion").await;
        let c = post_comment(&app.state, &author, first.id, "hello").await.unwrap();

        let err = delete_comment(&app.state, &author, second.id, c.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("comment")));
        assert!(app.state.store.find_comment(c.id).await.unwrap().is_some());
    }
}
