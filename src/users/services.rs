use tracing::info;
use uuid::Uuid;

use crate::auth::dto::PublicUser;
use crate::auth::services::validate_username;
use crate::authz::{enforce, Action, Target};
use crate::error::AppError;
use crate::images::{self, Folder, UploadItem};
use crate::state::AppState;
use crate::store::{ProfileChanges, PurgeOutcome, User, UserPurge};

async fn find_user(state: &AppState, id: Uuid) -> Result<User, AppError> {
    state.store.find_user(id).await?.ok_or(AppError::NotFound("user"))
}

/// Public view with the display picture presigned.
pub async fn public_user(state: &AppState, user: User) -> PublicUser {
    let picture = images::image_url(state, user.display_picture.as_deref()).await;
    PublicUser::new(user, picture)
}

/// Changes username and/or display picture. Nothing else on the account is
/// reachable from here.
pub async fn update_profile(
    state: &AppState,
    actor: &User,
    username: Option<String>,
    picture: Option<UploadItem>,
) -> Result<User, AppError> {
    enforce(actor.subject(), Target::account(actor.id, actor.role), Action::Update)?;

    if username.is_none() && picture.is_none() {
        return Err(AppError::validation("nothing to update"));
    }
    if let Some(name) = &username {
        validate_username(name)?;
    }

    let new_key = match picture {
        Some(item) => Some(images::upload_image(state, Folder::Avatars, actor.id, item).await?),
        None => None,
    };

    let changes = ProfileChanges { username, display_picture: new_key.clone() };
    let updated = match state.store.update_profile(actor.id, changes).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            if let Some(key) = &new_key {
                images::release_image(state, key).await;
            }
            return Err(AppError::NotFound("user"));
        }
        Err(e) => {
            if let Some(key) = &new_key {
                images::release_image(state, key).await;
            }
            return Err(e.into());
        }
    };

    if new_key.is_some() {
        if let Some(old) = &actor.display_picture {
            images::release_image(state, old).await;
        }
    }
    info!(user_id = %updated.id, "profile updated");
    Ok(updated)
}

/// Self-service `user -> author`. The write only lands if the stored role is
/// still the one that was authorized; otherwise the fresh row is re-checked.
pub async fn upgrade_to_author(state: &AppState, actor: &User) -> Result<User, AppError> {
    let mut current = actor.clone();
    loop {
        enforce(current.subject(), Target::account(current.id, current.role), Action::Upgrade)?;
        let role = current.role.upgrade()?;
        if let Some(user) = state.store.set_role(current.id, current.role, role).await? {
            info!(user_id = %user.id, role = %user.role, "role upgraded");
            return Ok(user);
        }
        // roles only rise, so this settles within a couple of rounds
        current = find_user(state, current.id).await?;
    }
}

/// Admin-service `* -> admin`.
pub async fn promote(state: &AppState, actor: &User, target_id: Uuid) -> Result<User, AppError> {
    let mut target = find_user(state, target_id).await?;
    loop {
        enforce(actor.subject(), Target::account(target.id, target.role), Action::Promote)?;
        let role = target.role.promote()?;
        if let Some(user) = state.store.set_role(target.id, target.role, role).await? {
            info!(admin_id = %actor.id, user_id = %user.id, role = %user.role, "role promoted");
            return Ok(user);
        }
        target = find_user(state, target.id).await?;
    }
}

/// Deletes `target_id` and everything it owns. Used for both self-deletion
/// and admin deletion; the engine tells them apart. The store refuses the
/// purge when the locked row no longer holds the authorized role, and the
/// decision is taken again against the role it reports.
pub async fn delete_account(
    state: &AppState,
    actor: &User,
    target_id: Uuid,
) -> Result<UserPurge, AppError> {
    let mut target = find_user(state, target_id).await?;
    let purge = loop {
        enforce(actor.subject(), Target::account(target.id, target.role), Action::Delete)?;
        match state.store.purge_user(target.id, target.role).await? {
            PurgeOutcome::Purged(purge) => break purge,
            PurgeOutcome::Missing => return Err(AppError::NotFound("user")),
            PurgeOutcome::RoleChanged(role) => target.role = role,
        }
    };
    info!(
        actor_id = %actor.id,
        user_id = %purge.user.id,
        deleted_blogs = purge.deleted_blogs,
        "account deleted"
    );
    images::release_images(state, &purge.released_images).await;
    Ok(purge)
}

pub async fn list_users(state: &AppState, actor: &User) -> Result<Vec<User>, AppError> {
    enforce(actor.subject(), Target::directory(), Action::ListAll)?;
    Ok(state.store.list_users().await?)
}
