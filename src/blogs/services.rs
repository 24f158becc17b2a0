use tracing::{info, warn};
use uuid::Uuid;

use super::category::Category;
use super::dto::{BlogInput, ListQuery};
use super::slug::{candidate, slugify};
use crate::authz::{enforce, Action, Target};
use crate::error::AppError;
use crate::images::{self, Folder};
use crate::state::AppState;
use crate::store::{
    Blog, BlogChanges, BlogFilter, CommentView, LikeState, NewBlog, StoreError, User,
};

pub const MIN_TITLE_LEN: usize = 6;
pub const MIN_DESCRIPTION_WORDS: usize = 20;
pub const DEFAULT_PAGE_SIZE: i64 = 5;
pub const MAX_PAGE_SIZE: i64 = 50;

const DUPLICATE_TITLE: &str = "A blog with this title already exists";

/// Static segments under `/blogs/` that a slug must never take.
const RESERVED_SLUGS: &[&str] = &["author"];

pub fn validate_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.chars().count() < MIN_TITLE_LEN {
        return Err(AppError::validation(format!(
            "title should be at least {MIN_TITLE_LEN} characters"
        )));
    }
    Ok(title.to_string())
}

pub fn validate_description(description: &str) -> Result<String, AppError> {
    let words = description.split_whitespace().count();
    if words < MIN_DESCRIPTION_WORDS {
        return Err(AppError::validation(format!(
            "description should be at least {MIN_DESCRIPTION_WORDS} words"
        )));
    }
    Ok(description.trim().to_string())
}

pub fn parse_category(raw: &str) -> Result<Category, AppError> {
    raw.parse::<Category>()
        .map_err(|e| AppError::validation(e.to_string()))
}

/// `(page, limit, offset)` with page >= 1 and limit clamped to 1..=50.
pub fn page_window(page: Option<i64>, limit: Option<i64>) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, limit, (page - 1) * limit)
}

fn map_title_conflict(e: StoreError) -> AppError {
    match e {
        StoreError::Conflict(c) if c.contains("title") => AppError::conflict(DUPLICATE_TITLE),
        other => other.into(),
    }
}

/// First free slug derived from `title`. `owner` keeps its own current slug.
async fn unique_slug(state: &AppState, title: &str, owner: Option<&Blog>) -> Result<String, AppError> {
    let base = slugify(title);
    let mut attempt = 1;
    loop {
        let slug = candidate(&base, attempt);
        if RESERVED_SLUGS.contains(&slug.as_str()) {
            attempt += 1;
            continue;
        }
        if owner.is_some_and(|b| b.slug == slug) || !state.store.slug_taken(&slug).await? {
            return Ok(slug);
        }
        attempt += 1;
    }
}

async fn find_blog(state: &AppState, id: Uuid) -> Result<Blog, AppError> {
    state.store.find_blog(id).await?.ok_or(AppError::NotFound("blog"))
}

#[derive(Debug)]
pub struct Listing {
    pub blogs: Vec<Blog>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// Anonymous listing, newest first.
pub async fn list_public(state: &AppState, query: ListQuery) -> Result<Listing, AppError> {
    let category = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
        .map(parse_category)
        .transpose()?;
    let search = query
        .search
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let (page, limit, offset) = page_window(query.page, query.limit);

    let filter = BlogFilter { search, category, author_id: None, limit: Some(limit), offset };
    let blogs = state.store.list_blogs(&filter).await?;
    let total = state.store.count_blogs(&filter).await?;
    Ok(Listing { blogs, total, page, limit })
}

/// A blog by slug with its author and comments.
pub async fn get_by_slug(
    state: &AppState,
    slug: &str,
) -> Result<(Blog, Option<User>, Vec<CommentView>), AppError> {
    let blog = state
        .store
        .find_blog_by_slug(slug)
        .await?
        .ok_or(AppError::NotFound("blog"))?;
    let author = state.store.find_user(blog.author_id).await?;
    let comments = state.store.list_comments(blog.id).await?;
    Ok((blog, author, comments))
}

pub async fn list_own(state: &AppState, actor: &User) -> Result<Vec<Blog>, AppError> {
    let filter = BlogFilter { author_id: Some(actor.id), ..Default::default() };
    Ok(state.store.list_blogs(&filter).await?)
}

pub async fn list_all(state: &AppState, actor: &User) -> Result<Vec<Blog>, AppError> {
    enforce(actor.subject(), Target::directory(), Action::ListAll)?;
    Ok(state.store.list_blogs(&BlogFilter::default()).await?)
}

pub async fn create_blog(state: &AppState, actor: &User, input: BlogInput) -> Result<Blog, AppError> {
    // role gate before anything is read or uploaded
    enforce(actor.subject(), Target::blog(actor.id), Action::Create)?;

    let (Some(title), Some(description), Some(category)) =
        (input.title, input.description, input.category)
    else {
        return Err(AppError::validation("Please fill all fields"));
    };
    let Some(image) = input.image else {
        return Err(AppError::validation("Please upload an image"));
    };
    let title = validate_title(&title)?;
    let description = validate_description(&description)?;
    let category = parse_category(&category)?;

    if state.store.title_taken(&title, None).await? {
        warn!(%title, "duplicate blog title");
        return Err(AppError::conflict(DUPLICATE_TITLE));
    }
    let slug = unique_slug(state, &title, None).await?;

    let key = images::upload_image(state, Folder::Blogs, actor.id, image).await?;
    let new = NewBlog {
        title,
        slug,
        description,
        category,
        blog_image: Some(key.clone()),
        author_id: actor.id,
    };
    match state.store.create_blog(new).await {
        Ok(blog) => {
            info!(blog_id = %blog.id, author_id = %actor.id, slug = %blog.slug, "blog created");
            Ok(blog)
        }
        Err(e) => {
            images::release_image(state, &key).await;
            Err(map_title_conflict(e))
        }
    }
}

pub async fn update_blog(
    state: &AppState,
    actor: &User,
    blog_id: Uuid,
    input: BlogInput,
) -> Result<Blog, AppError> {
    let blog = find_blog(state, blog_id).await?;
    enforce(actor.subject(), Target::blog(blog.author_id), Action::Update)?;

    let mut changes = BlogChanges::default();
    if let Some(title) = input.title {
        let title = validate_title(&title)?;
        if title != blog.title {
            if state.store.title_taken(&title, Some(blog.id)).await? {
                return Err(AppError::conflict(DUPLICATE_TITLE));
            }
            changes.slug = Some(unique_slug(state, &title, Some(&blog)).await?);
            changes.title = Some(title);
        }
    }
    if let Some(description) = input.description {
        changes.description = Some(validate_description(&description)?);
    }
    if let Some(category) = input.category {
        changes.category = Some(parse_category(&category)?);
    }
    if let Some(image) = input.image {
        let key = images::upload_image(state, Folder::Blogs, blog.author_id, image).await?;
        changes.blog_image = Some(key);
    }

    let new_key = changes.blog_image.clone();
    let updated = match state.store.update_blog(blog.id, changes).await {
        Ok(Some(updated)) => updated,
        Ok(None) => {
            if let Some(key) = &new_key {
                images::release_image(state, key).await;
            }
            return Err(AppError::NotFound("blog"));
        }
        Err(e) => {
            if let Some(key) = &new_key {
                images::release_image(state, key).await;
            }
            return Err(map_title_conflict(e));
        }
    };

    if new_key.is_some() {
        if let Some(old) = &blog.blog_image {
            images::release_image(state, old).await;
        }
    }
    info!(blog_id = %updated.id, actor_id = %actor.id, "blog updated");
    Ok(updated)
}

/// Deletes the blog with its comments, then releases its image.
pub async fn delete_blog(state: &AppState, actor: &User, blog_id: Uuid) -> Result<Blog, AppError> {
    let blog = find_blog(state, blog_id).await?;
    enforce(actor.subject(), Target::blog(blog.author_id), Action::Delete)?;

    let deleted = state
        .store
        .delete_blog(blog.id)
        .await?
        .ok_or(AppError::NotFound("blog"))?;
    info!(
        blog_id = %deleted.id,
        actor_id = %actor.id,
        comments = deleted.comment_ids.len(),
        "blog deleted"
    );
    if let Some(key) = &deleted.blog_image {
        images::release_image(state, key).await;
    }
    Ok(deleted)
}

pub async fn record_view(state: &AppState, actor: &User, blog_id: Uuid) -> Result<i64, AppError> {
    let blog = find_blog(state, blog_id).await?;
    enforce(actor.subject(), Target::blog(blog.author_id), Action::View)?;
    state
        .store
        .increment_views(blog.id)
        .await?
        .ok_or(AppError::NotFound("blog"))
}

pub async fn toggle_like(state: &AppState, actor: &User, blog_id: Uuid) -> Result<LikeState, AppError> {
    let blog = find_blog(state, blog_id).await?;
    enforce(actor.subject(), Target::blog(blog.author_id), Action::Like)?;
    let like = state
        .store
        .toggle_like(blog.id, actor.id)
        .await?
        .ok_or(AppError::NotFound("blog"))?;
    info!(blog_id = %blog.id, user_id = %actor.id, liked = like.liked, "like toggled");
    Ok(like)
}
