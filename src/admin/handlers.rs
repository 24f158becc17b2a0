use axum::{
    extract::{Path, State},
    routing::{delete, get, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::{dto::PublicUser, services::current_user, AuthUser};
use crate::blogs::{dto::BlogResponse, handlers::blog_responses};
use crate::comments::{self, dto::DeletedComment};
use crate::error::AppError;
use crate::state::AppState;
use crate::users::{self, dto::DeletedAccount};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/:user", delete(delete_user))
        .route("/admin/users/:user/role", put(promote_user))
        .route("/admin/blogs", get(list_blogs))
        .route("/admin/blogs/:blog/comments/:comment", delete(delete_comment))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    let actor = current_user(&state, user_id).await?;
    let found = users::services::list_users(&state, &actor).await?;
    let mut out = Vec::with_capacity(found.len());
    for user in found {
        out.push(users::services::public_user(&state, user).await);
    }
    Ok(Json(out))
}

#[instrument(skip(state))]
pub async fn list_blogs(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<BlogResponse>>, AppError> {
    let actor = current_user(&state, user_id).await?;
    let blogs = crate::blogs::services::list_all(&state, &actor).await?;
    Ok(Json(blog_responses(&state, blogs).await))
}

#[instrument(skip(state))]
pub async fn promote_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(target): Path<Uuid>,
) -> Result<Json<PublicUser>, AppError> {
    let actor = current_user(&state, user_id).await?;
    let user = users::services::promote(&state, &actor, target).await?;
    Ok(Json(users::services::public_user(&state, user).await))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(target): Path<Uuid>,
) -> Result<Json<DeletedAccount>, AppError> {
    let actor = current_user(&state, user_id).await?;
    let purge = users::services::delete_account(&state, &actor, target).await?;
    Ok(Json(DeletedAccount::from(&purge)))
}

#[instrument(skip(state))]
pub async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((blog_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<DeletedComment>, AppError> {
    let actor = current_user(&state, user_id).await?;
    let c = comments::services::delete_comment(&state, &actor, blog_id, comment_id).await?;
    Ok(Json(DeletedComment { id: c.id, blog_id: c.blog_id }))
}
