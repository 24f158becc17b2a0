use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::category::Category;
use crate::comments::dto::CommentResponse;
use crate::images::{MultipartForm, UploadItem};
use crate::store::{Blog, LikeState};

/// Query for the public listing: `?search=&category=&page=1&limit=5`.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Multipart fields of a blog create or edit. Every field is optional here;
/// create checks which ones are required.
#[derive(Default)]
pub struct BlogInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image: Option<UploadItem>,
}

pub const IMAGE_FIELD: &str = "blogImage";

impl From<MultipartForm> for BlogInput {
    fn from(mut form: MultipartForm) -> Self {
        Self {
            title: form.text("title"),
            description: form.text("description"),
            category: form.text("category"),
            image: form.take_file(IMAGE_FIELD),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BlogResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub category: Category,
    pub blog_image: Option<String>, // presigned URL
    pub author_id: Uuid,
    pub views: i64,
    pub likes: usize,
    pub liked_by: Vec<Uuid>,
    pub comment_count: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl BlogResponse {
    pub fn new(blog: Blog, image_url: Option<String>) -> Self {
        Self {
            id: blog.id,
            title: blog.title,
            slug: blog.slug,
            description: blog.description,
            category: blog.category,
            blog_image: image_url,
            author_id: blog.author_id,
            views: blog.views,
            likes: blog.likes.len(),
            liked_by: blog.likes,
            comment_count: blog.comment_ids.len(),
            created_at: blog.created_at,
            updated_at: blog.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BlogPage {
    pub blogs: Vec<BlogResponse>,
    pub total_blogs: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub username: String,
    pub display_picture: Option<String>, // presigned URL
}

/// A single blog as read by slug.
#[derive(Debug, Serialize)]
pub struct BlogDetail {
    #[serde(flatten)]
    pub blog: BlogResponse,
    pub author: Option<AuthorSummary>,
    pub comments: Vec<CommentResponse>,
}

#[derive(Debug, Serialize)]
pub struct ViewsResponse {
    pub views: i64,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes: i64,
}

impl From<LikeState> for LikeResponse {
    fn from(state: LikeState) -> Self {
        Self { liked: state.liked, likes: state.likes }
    }
}

#[derive(Debug, Serialize)]
pub struct DeletedBlog {
    pub id: Uuid,
}
