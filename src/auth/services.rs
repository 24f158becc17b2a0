use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{LoginRequest, SignupRequest};
use super::jwt::JwtKeys;
use super::password::{check_password, hash_password};
use crate::error::AppError;
use crate::state::AppState;
use crate::store::{NewUser, StoreError, User};

pub const MIN_USERNAME_LEN: usize = 4;
pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@([a-zA-Z0-9-]+\.)+[a-zA-Z]{2,}$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn validate_username(username: &str) -> Result<(), AppError> {
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(AppError::validation(format!(
            "username should be at least {MIN_USERNAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Normalizes the request in place and checks every signup rule.
pub fn validate_signup(req: &mut SignupRequest) -> Result<(), AppError> {
    req.username = req.username.trim().to_string();
    req.email = req.email.trim().to_lowercase();

    if req.username.is_empty()
        || req.email.is_empty()
        || req.password.is_empty()
        || req.confirm_password.is_empty()
    {
        return Err(AppError::validation("Please fill all fields"));
    }
    validate_username(&req.username)?;
    if !is_valid_email(&req.email) {
        return Err(AppError::validation("Please enter a proper email"));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password should be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if req.password != req.confirm_password {
        return Err(AppError::validation("Password and confirm password must match"));
    }
    Ok(())
}

pub async fn signup(state: &AppState, mut req: SignupRequest) -> Result<User, AppError> {
    validate_signup(&mut req)?;

    if state.store.find_user_by_email(&req.email).await?.is_some() {
        warn!(email = %req.email, "email already registered");
        return Err(AppError::conflict("User with this email already exists"));
    }

    let password_hash = hash_password(&req.password)?;
    let user = state
        .store
        .create_user(NewUser {
            username: req.username,
            email: req.email,
            password_hash,
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => AppError::conflict("User with this email already exists"),
            other => other.into(),
        })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

pub async fn login(state: &AppState, req: LoginRequest) -> Result<User, AppError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::validation("Please fill all the fields"));
    }

    let Some(user) = state.store.find_user_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::unauthenticated("Invalid credentials"));
    };

    if !check_password(&req.password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::unauthenticated("Invalid credentials"));
    }

    info!(user_id = %user.id, "user logged in");
    Ok(user)
}

pub async fn refresh(state: &AppState, keys: &JwtKeys, token: &str) -> Result<User, AppError> {
    let user_id = keys.verify_refresh(token)?;
    current_user(state, user_id).await
}

/// Access + refresh token pair for `user_id`.
pub fn issue_tokens(keys: &JwtKeys, user_id: Uuid) -> Result<(String, String), AppError> {
    let access = keys.sign_access(user_id)?;
    let refresh = keys.sign_refresh(user_id)?;
    Ok((access, refresh))
}

/// Resolves a token identity to a live account.
pub async fn current_user(state: &AppState, user_id: Uuid) -> Result<User, AppError> {
    state.store.find_user(user_id).await?.ok_or_else(|| {
        warn!(%user_id, "token for a missing user");
        AppError::unauthenticated("User not found, please register")
    })
}
