use actix_web::dev::HttpServiceFactory;
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};

use serde::Deserialize;

use sqlx::PgPool;

use uuid::Uuid;

use crate::domain::{NewPost, Post, PostStatus};
use crate::error::{Error, Result};
use crate::repo::PostRepo;
use crate::storage::MediaStore;

/// Form deserialization wrapper for creating and amending posts
#[derive(Debug, Deserialize)]
pub struct PostForm {
    title: String,
    body: String,
    excerpt: Option<String>,
    status: Option<String>,
}

impl TryInto<NewPost> for PostForm {
    type Error = Error;

    fn try_into(self) -> Result<NewPost> {
        let status = match self.status.as_deref() {
            Some(value) => value.parse()?,
            None => PostStatus::Draft,
        };

        NewPost::new(&self.title, &self.body, self.excerpt, status)
    }
}

/// Create endpoint for new posts
#[tracing::instrument(name = "Create a post", skip_all)]
#[post("")]
async fn create(pool: web::Data<PgPool>, form: web::Form<PostForm>) -> Result<impl Responder> {
    let new_post: NewPost = form.into_inner().try_into()?;

    let mut post = Post::new(new_post);
    PostRepo::save(pool.get_ref(), &mut post).await?;

    Ok(HttpResponse::Created().json(post))
}

/// Public read endpoint; drafts and archived posts stay hidden
#[tracing::instrument(name = "Show a published post", skip(pool))]
#[get("/{slug}")]
async fn show(pool: web::Data<PgPool>, path: web::Path<(String,)>) -> Result<impl Responder> {
    let (slug,) = path.into_inner();

    let post = PostRepo::fetch_published_by_slug(pool.get_ref(), &slug)
        .await?
        .ok_or(Error::NotFound)?;

    Ok(HttpResponse::Ok().json(post))
}

/// Amend an existing post. The stored slug is already non-empty, so the save
/// pipeline leaves it untouched even when the title changes.
#[tracing::instrument(name = "Update a post", skip(pool, form))]
#[put("/{id}")]
async fn update(
    pool: web::Data<PgPool>,
    path: web::Path<(Uuid,)>,
    form: web::Form<PostForm>,
) -> Result<impl Responder> {
    let (id,) = path.into_inner();
    let amendment: NewPost = form.into_inner().try_into()?;

    let mut post = PostRepo::fetch_by_id(pool.get_ref(), id)
        .await?
        .ok_or(Error::NotFound)?;

    post.title = amendment.title;
    post.body = amendment.body;
    post.status = amendment.status;
    if let Some(excerpt) = amendment.excerpt {
        post.excerpt = excerpt;
    }

    PostRepo::save(pool.get_ref(), &mut post).await?;

    Ok(HttpResponse::Ok().json(post))
}

/// Delete a post and, with the row gone, clean up the blobs it owned
#[tracing::instrument(name = "Delete a post", skip(pool, media_store))]
#[delete("/{id}")]
async fn remove(
    pool: web::Data<PgPool>,
    media_store: web::Data<MediaStore>,
    path: web::Path<(Uuid,)>,
) -> Result<impl Responder> {
    let (id,) = path.into_inner();

    let post = PostRepo::delete(pool.get_ref(), id)
        .await?
        .ok_or(Error::NotFound)?;

    media_store.remove_post_media(&post).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// Upload endpoint for media owned by a post
#[tracing::instrument(name = "Upload post media", skip(pool, media_store, bytes))]
#[post("/{id}/media/{filename}")]
async fn upload_media(
    pool: web::Data<PgPool>,
    media_store: web::Data<MediaStore>,
    path: web::Path<(Uuid, String)>,
    bytes: web::Bytes,
) -> Result<impl Responder> {
    let (id, filename) = path.into_inner();

    let post = PostRepo::fetch_by_id(pool.get_ref(), id)
        .await?
        .ok_or(Error::NotFound)?;

    let stored_path = media_store.store(&post, &filename, &bytes).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({ "path": stored_path })))
}

/// Post endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/posts")
        .service(create)
        .service(upload_media)
        .service(show)
        .service(update)
        .service(remove)
}
