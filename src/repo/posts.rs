use std::collections::HashSet;

use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, PgPool, Row};

use uuid::Uuid;

use crate::domain::{slug, Post};
use crate::error::{Error, Result};

use super::is_unique_violation;

impl sqlx::FromRow<'_, PgRow> for Post {
    fn from_row(row: &PgRow) -> sqlx::Result<Self> {
        let status: String = row.try_get("status")?;
        let status = status.parse().map_err(|_| sqlx::Error::ColumnDecode {
            index: "status".into(),
            source: format!("unknown post status: {}", status).into(),
        })?;

        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            slug: row.try_get("slug")?,
            body: row.try_get("body")?,
            excerpt: row.try_get("excerpt")?,
            reading_time: row.try_get("reading_time")?,
            status,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            published_at: row.try_get("published_at")?,
        })
    }
}

/// Repository for blog post records
pub struct PostRepo;

impl PostRepo {
    /// Persist a post, running the explicit pre-save pipeline first.
    ///
    /// The used-slug lookup excludes the post's own row so updates never
    /// self-collide. When a concurrent save wins the race for the same base
    /// slug, the resulting unique violation is resolved by retrying once with
    /// the UUID-suffixed slug, which cannot collide.
    #[tracing::instrument(name = "Save post", skip(pool, post), fields(id = %post.id))]
    pub async fn save(pool: &PgPool, post: &mut Post) -> Result<()> {
        if post.slug.is_empty() {
            let base = slug::slugify(&post.title);
            let used = Self::used_slugs(pool, &base, post.id).await?;
            post.prepare_for_save(&used);
        } else {
            post.prepare_for_save(&HashSet::new());
        }

        match Self::upsert(pool, post).await {
            Err(Error::Database(ref e)) if is_unique_violation(e) => {
                let mut used = HashSet::new();
                used.insert(std::mem::take(&mut post.slug));
                post.slug = slug::allocate(&post.title, post.id, &used);
                Self::upsert(pool, post).await
            }
            other => other,
        }
    }

    #[tracing::instrument(name = "Fetch post by id", skip(executor))]
    pub async fn fetch_by_id<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
    ) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>("select * from posts where id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(post)
    }

    /// Fetch a post by slug, visible to the public site (published only)
    #[tracing::instrument(name = "Fetch published post by slug", skip(executor))]
    pub async fn fetch_published_by_slug<'con>(
        executor: impl PgExecutor<'con>,
        slug: &str,
    ) -> Result<Option<Post>> {
        let post =
            sqlx::query_as::<_, Post>("select * from posts where slug = $1 and status = $2")
                .bind(slug)
                .bind("published")
                .fetch_optional(executor)
                .await?;

        Ok(post)
    }

    /// Delete a post, returning the removed record so the caller can run the
    /// synchronous blob-cleanup hook against it
    #[tracing::instrument(name = "Delete post", skip(executor))]
    pub async fn delete<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
    ) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>("delete from posts where id = $1 returning *")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(post)
    }

    /// Slugs equal to `candidate` held by rows other than `own_id`
    async fn used_slugs<'con>(
        executor: impl PgExecutor<'con>,
        candidate: &str,
        own_id: Uuid,
    ) -> Result<HashSet<String>> {
        if candidate.is_empty() {
            return Ok(HashSet::new());
        }

        let slugs = sqlx::query_scalar::<_, String>(
            "select slug from posts where slug = $1 and id <> $2",
        )
        .bind(candidate)
        .bind(own_id)
        .fetch_all(executor)
        .await?;

        Ok(slugs.into_iter().collect())
    }

    async fn upsert<'con>(executor: impl PgExecutor<'con>, post: &Post) -> Result<()> {
        sqlx::query(
            "insert into posts \
             (id, title, slug, body, excerpt, reading_time, status, created_at, updated_at, published_at) \
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             on conflict (id) do update set \
             title = excluded.title, slug = excluded.slug, body = excluded.body, \
             excerpt = excluded.excerpt, reading_time = excluded.reading_time, \
             status = excluded.status, updated_at = excluded.updated_at, \
             published_at = excluded.published_at",
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.body)
        .bind(&post.excerpt)
        .bind(post.reading_time)
        .bind(post.status.as_str())
        .bind(post.created_at)
        .bind(post.updated_at)
        .bind(post.published_at)
        .execute(executor)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use claims::{assert_none, assert_some};

    use crate::domain::{NewPost, PostStatus};

    use super::*;

    fn post_titled(title: &str) -> Post {
        Post::new(NewPost::new(title, "some body text", None, PostStatus::Draft).unwrap())
    }

    #[sqlx::test]
    async fn save_runs_the_pipeline_and_allocates_the_base_slug(pool: PgPool) {
        let mut post = post_titled("My First Post!!");

        PostRepo::save(&pool, &mut post).await.expect("Failed to save post");

        assert_eq!(post.slug, "my-first-post");
        assert_eq!(post.reading_time, 1);

        let stored = PostRepo::fetch_by_id(&pool, post.id).await.unwrap();
        let stored = assert_some!(stored);
        assert_eq!(stored.slug, post.slug);
        assert_eq!(stored.excerpt, "some body text");
    }

    #[sqlx::test]
    async fn same_title_gets_a_uuid_suffixed_slug(pool: PgPool) {
        let mut first = post_titled("Same Title");
        PostRepo::save(&pool, &mut first).await.expect("Failed to save first post");

        let mut second = post_titled("Same Title");
        PostRepo::save(&pool, &mut second).await.expect("Failed to save second post");

        assert_eq!(first.slug, "same-title");
        assert_eq!(second.slug, format!("same-title-{}", slug::short_id(second.id)));
    }

    #[sqlx::test]
    async fn resaving_a_post_does_not_self_collide(pool: PgPool) {
        let mut post = post_titled("My Post");
        PostRepo::save(&pool, &mut post).await.expect("Failed to save post");

        post.body = "an amended body".into();
        PostRepo::save(&pool, &mut post).await.expect("Failed to resave post");

        assert_eq!(post.slug, "my-post");
    }

    #[sqlx::test]
    async fn save_retries_once_after_losing_the_slug_race(pool: PgPool) {
        let mut winner = post_titled("Same Title");
        PostRepo::save(&pool, &mut winner).await.expect("Failed to save winner");

        // A save that passed the uniqueness check before the winner
        // committed arrives with the same slug already allocated
        let mut loser = post_titled("Same Title");
        loser.slug = "same-title".into();

        PostRepo::save(&pool, &mut loser).await.expect("Failed to save after race");

        assert_eq!(loser.slug, format!("same-title-{}", slug::short_id(loser.id)));
        assert_some!(PostRepo::fetch_by_id(&pool, loser.id).await.unwrap());
    }

    #[sqlx::test]
    async fn published_posts_are_fetchable_by_slug(pool: PgPool) {
        let new_post =
            NewPost::new("Live Post", "some body text", None, PostStatus::Published).unwrap();
        let mut post = Post::new(new_post);
        PostRepo::save(&pool, &mut post).await.expect("Failed to save post");

        let mut draft = post_titled("Hidden Draft");
        PostRepo::save(&pool, &mut draft).await.expect("Failed to save draft");

        assert_some!(PostRepo::fetch_published_by_slug(&pool, "live-post")
            .await
            .unwrap());
        assert_none!(PostRepo::fetch_published_by_slug(&pool, "hidden-draft")
            .await
            .unwrap());
    }

    #[sqlx::test]
    async fn delete_returns_the_removed_row_for_cleanup(pool: PgPool) {
        let mut post = post_titled("Doomed");
        PostRepo::save(&pool, &mut post).await.expect("Failed to save post");

        let removed = PostRepo::delete(&pool, post.id).await.unwrap();
        let removed = assert_some!(removed);
        assert_eq!(removed.slug, "doomed");

        assert_none!(PostRepo::delete(&pool, post.id).await.unwrap());
        assert_none!(PostRepo::fetch_by_id(&pool, post.id).await.unwrap());
    }
}
