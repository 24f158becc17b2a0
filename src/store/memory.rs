//! In-process store for tests. One lock over all collections gives the same
//! per-document atomicity the Postgres statements provide.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::*;
use crate::authz::Role;

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    blogs: HashMap<Uuid, Blog>,
    comments: HashMap<Uuid, Comment>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops a backlink without touching the comment record.
    pub async fn detach_backlink(&self, blog_id: Uuid, comment_id: Uuid) {
        let mut inner = self.inner.lock().await;
        if let Some(blog) = inner.blogs.get_mut(&blog_id) {
            blog.comment_ids.retain(|id| *id != comment_id);
        }
    }

    /// Drops a comment record without touching the backlink.
    pub async fn drop_comment_record(&self, comment_id: Uuid) {
        self.inner.lock().await.comments.remove(&comment_id);
    }

    pub async fn comment_count(&self) -> usize {
        self.inner.lock().await.comments.len()
    }
}

fn filter_accepts(blog: &Blog, filter: &BlogFilter) -> bool {
    let search_ok = filter
        .search
        .as_deref()
        .map(|s| blog.title.to_lowercase().contains(&s.to_lowercase()))
        .unwrap_or(true);
    let category_ok = filter.category.map(|c| blog.category == c).unwrap_or(true);
    let author_ok = filter.author_id.map(|a| blog.author_id == a).unwrap_or(true);
    search_ok && category_ok && author_ok
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let mut inner = self.inner.lock().await;
        if inner.users.values().any(|u| u.email == new.email) {
            return Err(StoreError::Conflict("users_email_key".into()));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            role: Role::User,
            display_picture: None,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let inner = self.inner.lock().await;
        let mut users: Vec<User> = inner.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> StoreResult<Option<User>> {
        let mut inner = self.inner.lock().await;
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(picture) = changes.display_picture {
            user.display_picture = Some(picture);
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn set_role(&self, id: Uuid, from: Role, to: Role) -> StoreResult<Option<User>> {
        let mut inner = self.inner.lock().await;
        Ok(inner
            .users
            .get_mut(&id)
            .filter(|user| user.role == from)
            .map(|user| {
                user.role = to;
                user.updated_at = OffsetDateTime::now_utc();
                user.clone()
            }))
    }

    async fn purge_user(&self, id: Uuid, expected: Role) -> StoreResult<PurgeOutcome> {
        let mut inner = self.inner.lock().await;
        match inner.users.get(&id) {
            None => return Ok(PurgeOutcome::Missing),
            Some(user) if user.role != expected => return Ok(PurgeOutcome::RoleChanged(user.role)),
            Some(_) => {}
        }
        let Some(user) = inner.users.remove(&id) else {
            return Ok(PurgeOutcome::Missing);
        };

        let own_comments: Vec<Uuid> = inner
            .comments
            .values()
            .filter(|c| c.user_id == id)
            .map(|c| c.id)
            .collect();
        for blog in inner.blogs.values_mut() {
            blog.comment_ids.retain(|c| !own_comments.contains(c));
            blog.likes.retain(|u| *u != id);
        }
        inner.comments.retain(|_, c| c.user_id != id);

        let authored: Vec<Blog> = inner
            .blogs
            .values()
            .filter(|b| b.author_id == id)
            .cloned()
            .collect();
        for blog in &authored {
            inner.blogs.remove(&blog.id);
            inner.comments.retain(|_, c| c.blog_id != blog.id);
        }

        let mut released_images: Vec<String> =
            authored.iter().filter_map(|b| b.blog_image.clone()).collect();
        released_images.extend(user.display_picture.clone());
        Ok(PurgeOutcome::Purged(UserPurge {
            user,
            deleted_blogs: authored.len(),
            released_images,
        }))
    }
}

#[async_trait]
impl BlogRepo for MemoryStore {
    async fn title_taken(&self, title: &str, except: Option<Uuid>) -> StoreResult<bool> {
        let inner = self.inner.lock().await;
        let wanted = title.to_lowercase();
        Ok(inner
            .blogs
            .values()
            .any(|b| Some(b.id) != except && b.title.to_lowercase() == wanted))
    }

    async fn slug_taken(&self, slug: &str) -> StoreResult<bool> {
        Ok(self.inner.lock().await.blogs.values().any(|b| b.slug == slug))
    }

    async fn create_blog(&self, new: NewBlog) -> StoreResult<Blog> {
        let mut inner = self.inner.lock().await;
        let wanted = new.title.to_lowercase();
        if inner.blogs.values().any(|b| b.title.to_lowercase() == wanted) {
            return Err(StoreError::Conflict("blogs_title_lower_key".into()));
        }
        if inner.blogs.values().any(|b| b.slug == new.slug) {
            return Err(StoreError::Conflict("blogs_slug_key".into()));
        }
        let now = OffsetDateTime::now_utc();
        let blog = Blog {
            id: Uuid::new_v4(),
            title: new.title,
            slug: new.slug,
            description: new.description,
            category: new.category,
            blog_image: new.blog_image,
            author_id: new.author_id,
            comment_ids: Vec::new(),
            views: 0,
            likes: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        inner.blogs.insert(blog.id, blog.clone());
        Ok(blog)
    }

    async fn find_blog(&self, id: Uuid) -> StoreResult<Option<Blog>> {
        Ok(self.inner.lock().await.blogs.get(&id).cloned())
    }

    async fn find_blog_by_slug(&self, slug: &str) -> StoreResult<Option<Blog>> {
        let inner = self.inner.lock().await;
        Ok(inner.blogs.values().find(|b| b.slug == slug).cloned())
    }

    async fn list_blogs(&self, filter: &BlogFilter) -> StoreResult<Vec<Blog>> {
        let inner = self.inner.lock().await;
        let mut blogs: Vec<Blog> = inner
            .blogs
            .values()
            .filter(|b| filter_accepts(b, filter))
            .cloned()
            .collect();
        blogs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let skip = filter.offset.max(0) as usize;
        let take = filter.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        Ok(blogs.into_iter().skip(skip).take(take).collect())
    }

    async fn count_blogs(&self, filter: &BlogFilter) -> StoreResult<i64> {
        let inner = self.inner.lock().await;
        Ok(inner.blogs.values().filter(|b| filter_accepts(b, filter)).count() as i64)
    }

    async fn update_blog(&self, id: Uuid, changes: BlogChanges) -> StoreResult<Option<Blog>> {
        let mut inner = self.inner.lock().await;
        if let Some(title) = &changes.title {
            let wanted = title.to_lowercase();
            if inner
                .blogs
                .values()
                .any(|b| b.id != id && b.title.to_lowercase() == wanted)
            {
                return Err(StoreError::Conflict("blogs_title_lower_key".into()));
            }
        }
        let Some(blog) = inner.blogs.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            blog.title = title;
        }
        if let Some(slug) = changes.slug {
            blog.slug = slug;
        }
        if let Some(description) = changes.description {
            blog.description = description;
        }
        if let Some(category) = changes.category {
            blog.category = category;
        }
        if let Some(image) = changes.blog_image {
            blog.blog_image = Some(image);
        }
        blog.updated_at = OffsetDateTime::now_utc();
        Ok(Some(blog.clone()))
    }

    async fn delete_blog(&self, id: Uuid) -> StoreResult<Option<Blog>> {
        let mut inner = self.inner.lock().await;
        let Some(blog) = inner.blogs.remove(&id) else {
            return Ok(None);
        };
        inner.comments.retain(|_, c| c.blog_id != id);
        Ok(Some(blog))
    }

    async fn increment_views(&self, id: Uuid) -> StoreResult<Option<i64>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.blogs.get_mut(&id).map(|blog| {
            blog.views += 1;
            blog.views
        }))
    }

    async fn toggle_like(&self, id: Uuid, user_id: Uuid) -> StoreResult<Option<LikeState>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.blogs.get_mut(&id).map(|blog| {
            let liked = if let Some(pos) = blog.likes.iter().position(|u| *u == user_id) {
                blog.likes.remove(pos);
                false
            } else {
                blog.likes.push(user_id);
                true
            };
            LikeState { liked, likes: blog.likes.len() as i64 }
        }))
    }
}

#[async_trait]
impl CommentRepo for MemoryStore {
    async fn add_comment(
        &self,
        blog_id: Uuid,
        user_id: Uuid,
        body: &str,
    ) -> StoreResult<Option<Comment>> {
        let mut inner = self.inner.lock().await;
        let Some(blog) = inner.blogs.get_mut(&blog_id) else {
            return Ok(None);
        };
        let comment = Comment {
            id: Uuid::new_v4(),
            comment: body.to_string(),
            blog_id,
            user_id,
            created_at: OffsetDateTime::now_utc(),
        };
        blog.comment_ids.push(comment.id);
        inner.comments.insert(comment.id, comment.clone());
        Ok(Some(comment))
    }

    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        Ok(self.inner.lock().await.comments.get(&id).cloned())
    }

    async fn list_comments(&self, blog_id: Uuid) -> StoreResult<Vec<CommentView>> {
        let inner = self.inner.lock().await;
        let Some(blog) = inner.blogs.get(&blog_id) else {
            return Ok(Vec::new());
        };
        Ok(blog
            .comment_ids
            .iter()
            .filter_map(|id| inner.comments.get(id))
            .filter_map(|c| {
                let author = inner.users.get(&c.user_id)?;
                Some(CommentView {
                    id: c.id,
                    comment: c.comment.clone(),
                    user_id: c.user_id,
                    username: author.username.clone(),
                    display_picture: author.display_picture.clone(),
                    created_at: c.created_at,
                })
            })
            .collect())
    }

    async fn remove_comment(&self, blog_id: Uuid, comment_id: Uuid) -> StoreResult<CommentRemoval> {
        let mut inner = self.inner.lock().await;
        let Some(referenced) = inner
            .blogs
            .get(&blog_id)
            .map(|b| b.comment_ids.contains(&comment_id))
        else {
            return Ok(CommentRemoval::Absent);
        };
        let exists = inner
            .comments
            .get(&comment_id)
            .is_some_and(|c| c.blog_id == blog_id);

        Ok(match (referenced, exists) {
            (true, true) => {
                let removed = inner.comments.remove(&comment_id);
                if let Some(blog) = inner.blogs.get_mut(&blog_id) {
                    blog.comment_ids.retain(|id| *id != comment_id);
                }
                match removed {
                    Some(comment) => CommentRemoval::Removed(comment),
                    None => CommentRemoval::RecordMissing,
                }
            }
            (false, true) => CommentRemoval::BacklinkMissing,
            (true, false) => CommentRemoval::RecordMissing,
            (false, false) => CommentRemoval::Absent,
        })
    }
}
