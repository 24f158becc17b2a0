use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{DeletedComment, NewCommentRequest, PostedComment};
use super::services;
use crate::auth::{services::current_user, AuthUser};
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/blogs/:blog/comments", post(post_comment))
        .route("/blogs/:blog/comments/:comment", delete(delete_comment))
}

#[instrument(skip(state, payload))]
pub async fn post_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(blog_id): Path<Uuid>,
    Json(payload): Json<NewCommentRequest>,
) -> Result<(StatusCode, Json<PostedComment>), AppError> {
    let actor = current_user(&state, user_id).await?;
    let c = services::post_comment(&state, &actor, blog_id, &payload.comment).await?;
    Ok((
        StatusCode::CREATED,
        Json(PostedComment {
            id: c.id,
            blog_id: c.blog_id,
            comment: c.comment,
            created_at: c.created_at,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((blog_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<DeletedComment>, AppError> {
    let actor = current_user(&state, user_id).await?;
    let c = services::delete_comment(&state, &actor, blog_id, comment_id).await?;
    Ok(Json(DeletedComment { id: c.id, blog_id: c.blog_id }))
}
