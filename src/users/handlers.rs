use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::put,
    Json, Router,
};
use tracing::instrument;

use super::dto::DeletedAccount;
use super::services;
use crate::auth::{dto::PublicUser, services::current_user, AuthUser};
use crate::blogs::handlers::MAX_UPLOAD_BYTES;
use crate::error::AppError;
use crate::images::MultipartForm;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/settings", put(update_settings).delete(delete_self))
        .route("/users/settings/role", put(upgrade_role))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

#[instrument(skip(state, form))]
pub async fn update_settings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    form: Multipart,
) -> Result<Json<PublicUser>, AppError> {
    let actor = current_user(&state, user_id).await?;
    let mut form = MultipartForm::read(form, &["displayPicture"]).await?;
    let picture = form.take_file("displayPicture");
    let user = services::update_profile(&state, &actor, form.text("username"), picture).await?;
    Ok(Json(services::public_user(&state, user).await))
}

#[instrument(skip(state))]
pub async fn upgrade_role(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let actor = current_user(&state, user_id).await?;
    let user = services::upgrade_to_author(&state, &actor).await?;
    Ok(Json(services::public_user(&state, user).await))
}

#[instrument(skip(state))]
pub async fn delete_self(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<DeletedAccount>, AppError> {
    let actor = current_user(&state, user_id).await?;
    let purge = services::delete_account(&state, &actor, actor.id).await?;
    Ok(Json(DeletedAccount::from(&purge)))
}
