use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{
    AuthorSummary, BlogDetail, BlogInput, BlogPage, BlogResponse, DeletedBlog, LikeResponse,
    ListQuery, ViewsResponse, IMAGE_FIELD,
};
use super::services;
use crate::auth::{services::current_user, AuthUser};
use crate::comments::dto::{CommentResponse, Commenter};
use crate::error::AppError;
use crate::images::{self, MultipartForm};
use crate::state::AppState;
use crate::store::Blog;

pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

// --- public routers ---

pub fn read_router() -> Router<AppState> {
    Router::new()
        .route("/blogs", get(list_blogs))
        .route("/blogs/author", get(list_own_blogs))
        .route("/blogs/:blog", get(get_blog))
}

pub fn write_router() -> Router<AppState> {
    Router::new()
        .route("/blogs", post(create_blog))
        .route("/blogs/:blog", put(update_blog).delete(delete_blog))
        .route("/blogs/:blog/views", post(record_view))
        .route("/blogs/:blog/likes", put(toggle_like))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

pub(crate) async fn blog_response(state: &AppState, blog: Blog) -> BlogResponse {
    let url = images::image_url(state, blog.blog_image.as_deref()).await;
    BlogResponse::new(blog, url)
}

pub(crate) async fn blog_responses(state: &AppState, blogs: Vec<Blog>) -> Vec<BlogResponse> {
    let mut out = Vec::with_capacity(blogs.len());
    for blog in blogs {
        out.push(blog_response(state, blog).await);
    }
    out
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_blogs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<BlogPage>, AppError> {
    let listing = services::list_public(&state, query).await?;
    Ok(Json(BlogPage {
        blogs: blog_responses(&state, listing.blogs).await,
        total_blogs: listing.total,
        page: listing.page,
        limit: listing.limit,
    }))
}

#[instrument(skip(state))]
pub async fn get_blog(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BlogDetail>, AppError> {
    let (blog, author, comments) = services::get_by_slug(&state, &slug).await?;

    let author = match author {
        Some(user) => Some(AuthorSummary {
            id: user.id,
            display_picture: images::image_url(&state, user.display_picture.as_deref()).await,
            username: user.username,
        }),
        None => None,
    };
    let mut rendered = Vec::with_capacity(comments.len());
    for c in comments {
        rendered.push(CommentResponse {
            id: c.id,
            comment: c.comment,
            user: Commenter {
                id: c.user_id,
                display_picture: images::image_url(&state, c.display_picture.as_deref()).await,
                username: c.username,
            },
            created_at: c.created_at,
        });
    }

    Ok(Json(BlogDetail {
        blog: blog_response(&state, blog).await,
        author,
        comments: rendered,
    }))
}

#[instrument(skip(state))]
pub async fn list_own_blogs(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<BlogResponse>>, AppError> {
    let actor = current_user(&state, user_id).await?;
    let blogs = services::list_own(&state, &actor).await?;
    Ok(Json(blog_responses(&state, blogs).await))
}

/// POST /blogs (multipart)
#[instrument(skip(state, mp))]
pub async fn create_blog(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mp: Multipart,
) -> Result<(StatusCode, Json<BlogResponse>), AppError> {
    let actor = current_user(&state, user_id).await?;
    let input = BlogInput::from(MultipartForm::read(mp, &[IMAGE_FIELD]).await?);
    let blog = services::create_blog(&state, &actor, input).await?;
    Ok((StatusCode::CREATED, Json(blog_response(&state, blog).await)))
}

/// PUT /blogs/:id (multipart, every field optional)
#[instrument(skip(state, mp))]
pub async fn update_blog(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(blog_id): Path<Uuid>,
    mp: Multipart,
) -> Result<Json<BlogResponse>, AppError> {
    let actor = current_user(&state, user_id).await?;
    let input = BlogInput::from(MultipartForm::read(mp, &[IMAGE_FIELD]).await?);
    let blog = services::update_blog(&state, &actor, blog_id, input).await?;
    Ok(Json(blog_response(&state, blog).await))
}

#[instrument(skip(state))]
pub async fn delete_blog(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(blog_id): Path<Uuid>,
) -> Result<Json<DeletedBlog>, AppError> {
    let actor = current_user(&state, user_id).await?;
    let blog = services::delete_blog(&state, &actor, blog_id).await?;
    Ok(Json(DeletedBlog { id: blog.id }))
}

#[instrument(skip(state))]
pub async fn record_view(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(blog_id): Path<Uuid>,
) -> Result<Json<ViewsResponse>, AppError> {
    let actor = current_user(&state, user_id).await?;
    let views = services::record_view(&state, &actor, blog_id).await?;
    Ok(Json(ViewsResponse { views }))
}

#[instrument(skip(state))]
pub async fn toggle_like(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(blog_id): Path<Uuid>,
) -> Result<Json<LikeResponse>, AppError> {
    let actor = current_user(&state, user_id).await?;
    let like = services::toggle_like(&state, &actor, blog_id).await?;
    Ok(Json(like.into()))
}
