use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::*;
use crate::authz::Role;

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

/// `search` as an ILIKE pattern with wildcards escaped.
fn like_pattern(search: &str) -> String {
    let mut out = String::with_capacity(search.len() + 2);
    out.push('%');
    for ch in search.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

#[async_trait]
impl UserRepo for PgStore {
    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, role, display_picture, created_at, updated_at
            "#,
        )
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, role, display_picture, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, role, display_picture, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, role, display_picture, created_at, updated_at
            FROM users
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET username = COALESCE($2, username),
                   display_picture = COALESCE($3, display_picture),
                   updated_at = now()
             WHERE id = $1
            RETURNING id, username, email, password_hash, role, display_picture, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.username)
        .bind(changes.display_picture)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn set_role(&self, id: Uuid, from: Role, to: Role) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET role = $3, updated_at = now()
             WHERE id = $1 AND role = $2
            RETURNING id, username, email, password_hash, role, display_picture, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn purge_user(&self, id: Uuid, expected: Role) -> StoreResult<PurgeOutcome> {
        let mut tx = self.db.begin().await?;

        let Some(user) = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, role, display_picture, created_at, updated_at
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(PurgeOutcome::Missing);
        };
        if user.role != expected {
            tx.rollback().await?;
            return Ok(PurgeOutcome::RoleChanged(user.role));
        }

        // strip exactly the rows this statement deleted, keeping backlink order
        let removed = sqlx::query_scalar::<_, Uuid>(
            "DELETE FROM comments WHERE user_id = $1 RETURNING id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        if !removed.is_empty() {
            sqlx::query(
                r#"
                UPDATE blogs
                   SET comment_ids = ARRAY(
                           SELECT ref.cid
                             FROM unnest(comment_ids) WITH ORDINALITY AS ref(cid, ord)
                            WHERE ref.cid <> ALL($1::uuid[])
                            ORDER BY ref.ord
                       )
                 WHERE comment_ids && $1::uuid[]
                "#,
            )
            .bind(&removed)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            DELETE FROM comments
             WHERE blog_id IN (SELECT b.id FROM blogs b WHERE b.author_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let images = sqlx::query_scalar::<_, Option<String>>(
            "DELETE FROM blogs WHERE author_id = $1 RETURNING blog_image",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE blogs
               SET likes = array_remove(likes, $1)
             WHERE $1 = ANY(likes)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let deleted_blogs = images.len();
        let mut released_images: Vec<String> = images.into_iter().flatten().collect();
        released_images.extend(user.display_picture.clone());
        debug!(user_id = %id, deleted_blogs, "user purged");
        Ok(PurgeOutcome::Purged(UserPurge { user, deleted_blogs, released_images }))
    }
}

#[async_trait]
impl BlogRepo for PgStore {
    async fn title_taken(&self, title: &str, except: Option<Uuid>) -> StoreResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM blogs
                 WHERE lower(title) = lower($1)
                   AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(title)
        .bind(except)
        .fetch_one(&self.db)
        .await?;
        Ok(taken)
    }

    async fn slug_taken(&self, slug: &str) -> StoreResult<bool> {
        let taken =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM blogs WHERE slug = $1)")
                .bind(slug)
                .fetch_one(&self.db)
                .await?;
        Ok(taken)
    }

    async fn create_blog(&self, new: NewBlog) -> StoreResult<Blog> {
        let blog = sqlx::query_as::<_, Blog>(
            r#"
            INSERT INTO blogs (title, slug, description, category, blog_image, author_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, title, slug, description, category, blog_image, author_id,
                      comment_ids, views, likes, created_at, updated_at
            "#,
        )
        .bind(&new.title)
        .bind(&new.slug)
        .bind(&new.description)
        .bind(new.category)
        .bind(&new.blog_image)
        .bind(new.author_id)
        .fetch_one(&self.db)
        .await?;
        Ok(blog)
    }

    async fn find_blog(&self, id: Uuid) -> StoreResult<Option<Blog>> {
        let blog = sqlx::query_as::<_, Blog>(
            r#"
            SELECT id, title, slug, description, category, blog_image, author_id,
                   comment_ids, views, likes, created_at, updated_at
            FROM blogs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(blog)
    }

    async fn find_blog_by_slug(&self, slug: &str) -> StoreResult<Option<Blog>> {
        let blog = sqlx::query_as::<_, Blog>(
            r#"
            SELECT id, title, slug, description, category, blog_image, author_id,
                   comment_ids, views, likes, created_at, updated_at
            FROM blogs
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.db)
        .await?;
        Ok(blog)
    }

    async fn list_blogs(&self, filter: &BlogFilter) -> StoreResult<Vec<Blog>> {
        let rows = sqlx::query_as::<_, Blog>(
            r#"
            SELECT id, title, slug, description, category, blog_image, author_id,
                   comment_ids, views, likes, created_at, updated_at
            FROM blogs
            WHERE ($1::text IS NULL OR title ILIKE $1)
              AND ($2::blog_category IS NULL OR category = $2)
              AND ($3::uuid IS NULL OR author_id = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.search.as_deref().map(like_pattern))
        .bind(filter.category)
        .bind(filter.author_id)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn count_blogs(&self, filter: &BlogFilter) -> StoreResult<i64> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM blogs
            WHERE ($1::text IS NULL OR title ILIKE $1)
              AND ($2::blog_category IS NULL OR category = $2)
              AND ($3::uuid IS NULL OR author_id = $3)
            "#,
        )
        .bind(filter.search.as_deref().map(like_pattern))
        .bind(filter.category)
        .bind(filter.author_id)
        .fetch_one(&self.db)
        .await?;
        Ok(total)
    }

    async fn update_blog(&self, id: Uuid, changes: BlogChanges) -> StoreResult<Option<Blog>> {
        let blog = sqlx::query_as::<_, Blog>(
            r#"
            UPDATE blogs
               SET title = COALESCE($2, title),
                   slug = COALESCE($3, slug),
                   description = COALESCE($4, description),
                   category = COALESCE($5, category),
                   blog_image = COALESCE($6, blog_image),
                   updated_at = now()
             WHERE id = $1
            RETURNING id, title, slug, description, category, blog_image, author_id,
                      comment_ids, views, likes, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.title)
        .bind(changes.slug)
        .bind(changes.description)
        .bind(changes.category)
        .bind(changes.blog_image)
        .fetch_optional(&self.db)
        .await?;
        Ok(blog)
    }

    async fn delete_blog(&self, id: Uuid) -> StoreResult<Option<Blog>> {
        let mut tx = self.db.begin().await?;

        let Some(blog) = sqlx::query_as::<_, Blog>(
            r#"
            SELECT id, title, slug, description, category, blog_image, author_id,
                   comment_ids, views, likes, created_at, updated_at
            FROM blogs
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        let removed = sqlx::query("DELETE FROM comments WHERE blog_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM blogs WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(blog_id = %id, comments = removed, "blog deleted with comments");
        Ok(Some(blog))
    }

    async fn increment_views(&self, id: Uuid) -> StoreResult<Option<i64>> {
        let views = sqlx::query_scalar::<_, i64>(
            "UPDATE blogs SET views = views + 1 WHERE id = $1 RETURNING views",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(views)
    }

    async fn toggle_like(&self, id: Uuid, user_id: Uuid) -> StoreResult<Option<LikeState>> {
        // one statement, so the row lock serializes concurrent toggles
        let row = sqlx::query_as::<_, (bool, i64)>(
            r#"
            UPDATE blogs
               SET likes = CASE
                       WHEN $2 = ANY(likes) THEN array_remove(likes, $2)
                       ELSE array_append(likes, $2)
                   END
             WHERE id = $1
            RETURNING $2 = ANY(likes), cardinality(likes)::bigint
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(|(liked, likes)| LikeState { liked, likes }))
    }
}

#[async_trait]
impl CommentRepo for PgStore {
    async fn add_comment(
        &self,
        blog_id: Uuid,
        user_id: Uuid,
        body: &str,
    ) -> StoreResult<Option<Comment>> {
        let mut tx = self.db.begin().await?;

        let exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM blogs WHERE id = $1 FOR UPDATE")
            .bind(blog_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (comment, blog_id, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, comment, blog_id, user_id, created_at
            "#,
        )
        .bind(body)
        .bind(blog_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE blogs SET comment_ids = array_append(comment_ids, $2) WHERE id = $1")
            .bind(blog_id)
            .bind(comment.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(comment))
    }

    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            "SELECT id, comment, blog_id, user_id, created_at FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(comment)
    }

    async fn list_comments(&self, blog_id: Uuid) -> StoreResult<Vec<CommentView>> {
        let rows = sqlx::query_as::<_, CommentView>(
            r#"
            SELECT c.id, c.comment, c.user_id, u.username, u.display_picture, c.created_at
            FROM blogs b
            CROSS JOIN LATERAL unnest(b.comment_ids) WITH ORDINALITY AS ref(comment_id, ord)
            JOIN comments c ON c.id = ref.comment_id
            JOIN users u ON u.id = c.user_id
            WHERE b.id = $1
            ORDER BY ref.ord
            "#,
        )
        .bind(blog_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn remove_comment(&self, blog_id: Uuid, comment_id: Uuid) -> StoreResult<CommentRemoval> {
        let mut tx = self.db.begin().await?;

        let Some(refs) = sqlx::query_scalar::<_, Vec<Uuid>>(
            "SELECT comment_ids FROM blogs WHERE id = $1 FOR UPDATE",
        )
        .bind(blog_id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(CommentRemoval::Absent);
        };

        let record = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, comment, blog_id, user_id, created_at
            FROM comments
            WHERE id = $1 AND blog_id = $2
            FOR UPDATE
            "#,
        )
        .bind(comment_id)
        .bind(blog_id)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match (refs.contains(&comment_id), record) {
            (true, Some(comment)) => {
                sqlx::query("DELETE FROM comments WHERE id = $1")
                    .bind(comment_id)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query(
                    "UPDATE blogs SET comment_ids = array_remove(comment_ids, $2) WHERE id = $1",
                )
                .bind(blog_id)
                .bind(comment_id)
                .execute(&mut *tx)
                .await?;
                tx.commit().await?;
                return Ok(CommentRemoval::Removed(comment));
            }
            (false, Some(_)) => CommentRemoval::BacklinkMissing,
            (true, None) => CommentRemoval::RecordMissing,
            (false, None) => CommentRemoval::Absent,
        };
        tx.rollback().await?;
        Ok(outcome)
    }
}
