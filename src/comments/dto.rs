use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Request body for posting a comment.
#[derive(Debug, Default, Deserialize)]
pub struct NewCommentRequest {
    #[serde(default)]
    pub comment: String,
}

/// The commenter as shown next to a comment.
#[derive(Debug, Serialize)]
pub struct Commenter {
    pub id: Uuid,
    pub username: String,
    pub display_picture: Option<String>, // presigned URL
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub comment: String,
    pub user: Commenter,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Returned after a comment is posted.
#[derive(Debug, Serialize)]
pub struct PostedComment {
    pub id: Uuid,
    pub blog_id: Uuid,
    pub comment: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct DeletedComment {
    pub id: Uuid,
    pub blog_id: Uuid,
}
