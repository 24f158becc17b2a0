use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, SignupRequest};
use super::jwt::{AuthUser, JwtKeys};
use super::services;
use crate::{error::AppError, images, state::AppState, store::User};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

async fn respond(state: &AppState, user: User) -> Result<AuthResponse, AppError> {
    let keys = JwtKeys::from_ref(state);
    let (access_token, refresh_token) = services::issue_tokens(&keys, user.id)?;
    let picture = images::image_url(state, user.display_picture.as_deref()).await;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::new(user, picture),
    })
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let user = services::signup(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(respond(&state, user).await?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = services::login(&state, payload).await?;
    Ok(Json(respond(&state, user).await?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let user = services::refresh(&state, &keys, &payload.refresh_token).await?;
    Ok(Json(respond(&state, user).await?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = services::current_user(&state, user_id).await?;
    let picture = images::image_url(&state, user.display_picture.as_deref()).await;
    Ok(Json(PublicUser::new(user, picture)))
}
