use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use serde::{Deserialize, Serialize};

use unicode_segmentation::UnicodeSegmentation;

use uuid::Uuid;

use crate::domain::slug;
use crate::error::{Error, Result};

/// Characters of body kept in a derived excerpt before truncation
const EXCERPT_LEN: usize = 300;
/// Marker appended to a truncated excerpt
const EXCERPT_MARKER: &str = "...";
/// Assumed reading speed in words per minute
const WORDS_PER_MINUTE: usize = 200;

const MAX_TITLE_LEN: usize = 250;

/// Publication status of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
    Archived,
}

impl PostStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }
}

impl FromStr for PostStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "archived" => Ok(Self::Archived),
            other => Err(Error::Validation(format!(
                "{} is not a valid post status",
                other
            ))),
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated request to create or amend a post
#[derive(Debug)]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub excerpt: Option<String>,
    pub status: PostStatus,
}

impl NewPost {
    /// An empty title is allowed: the slug allocator falls back to a
    /// UUID-derived slug for it.
    pub fn new(
        title: &str,
        body: &str,
        excerpt: Option<String>,
        status: PostStatus,
    ) -> Result<Self> {
        let title = title.trim();
        if title.graphemes(true).count() > MAX_TITLE_LEN {
            return Err(Error::Validation("Title too long".into()));
        }

        Ok(Self {
            title: title.to_string(),
            body: body.to_string(),
            excerpt: excerpt.filter(|e| !e.trim().is_empty()),
            status,
        })
    }
}

/// Stored post record
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    /// Stable identity; assigned at construction and never regenerated.
    /// Doubles as the collision-breaking slug suffix and as a component of
    /// the media storage path.
    pub id: Uuid,
    pub title: String,
    /// Unique URL-safe identifier; empty until the first save
    pub slug: String,
    /// Markdown source; rendered at display time only, never persisted rendered
    pub body: String,
    pub excerpt: String,
    /// Estimated minutes to read the body
    pub reading_time: i32,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn new(new_post: NewPost) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: new_post.title,
            slug: String::new(),
            body: new_post.body,
            excerpt: new_post.excerpt.unwrap_or_default(),
            reading_time: 0,
            status: new_post.status,
            created_at: now,
            updated_at: now,
            published_at: None,
        }
    }

    /// Pre-save pipeline: slug allocation plus derived-field computation.
    ///
    /// Invoked deliberately by the save path rather than hidden inside a
    /// generic persistence hook. `used_slugs` must exclude this post's own
    /// stored slug.
    ///
    /// - The slug is allocated once and never recomputed while non-empty.
    /// - The excerpt is derived only when not set explicitly.
    /// - The reading time is recomputed on every save with a non-empty body.
    pub fn prepare_for_save(&mut self, used_slugs: &HashSet<String>) {
        if self.slug.is_empty() {
            self.slug = slug::allocate(&self.title, self.id, used_slugs);
        }
        if self.excerpt.is_empty() && !self.body.is_empty() {
            self.excerpt = excerpt(&self.body);
        }
        if !self.body.is_empty() {
            self.reading_time = reading_time(&self.body) as i32;
        }
        if self.status == PostStatus::Published && self.published_at.is_none() {
            self.published_at = Some(Utc::now());
        }
        self.updated_at = Utc::now();
    }

    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }
}

/// First `EXCERPT_LEN` characters of the body, plus a truncation marker when
/// the body is longer; the body verbatim otherwise.
pub fn excerpt(body: &str) -> String {
    match body.char_indices().nth(EXCERPT_LEN) {
        Some((idx, _)) => format!("{}{}", &body[..idx], EXCERPT_MARKER),
        None => body.to_string(),
    }
}

/// Word count over `WORDS_PER_MINUTE`, rounded to nearest, floored at one
pub fn reading_time(body: &str) -> u32 {
    let words = body.split_whitespace().count();
    let minutes = (words as f64 / WORDS_PER_MINUTE as f64).round() as u32;
    minutes.max(1)
}

#[cfg(test)]
mod tests {
    use claims::{assert_err, assert_ok};

    use super::*;

    fn draft(title: &str, body: &str) -> Post {
        let new_post = NewPost::new(title, body, None, PostStatus::Draft).unwrap();
        Post::new(new_post)
    }

    #[test]
    fn excerpt_of_short_body_is_verbatim() {
        let body = "a".repeat(300);
        assert_eq!(excerpt(&body), body);
    }

    #[test]
    fn excerpt_of_long_body_is_truncated_with_marker() {
        let body = "a".repeat(301);
        let expected = format!("{}...", "a".repeat(300));
        assert_eq!(excerpt(&body), expected);
    }

    #[test]
    fn excerpt_truncates_on_character_boundaries() {
        let body = "ё".repeat(400);
        let expected = format!("{}...", "ё".repeat(300));
        assert_eq!(excerpt(&body), expected);
    }

    #[test]
    fn reading_time_rounds_to_nearest_minute() {
        let body = "word ".repeat(400);
        assert_eq!(reading_time(&body), 2);
    }

    #[test]
    fn reading_time_is_floored_at_one_minute() {
        let body = "word ".repeat(50);
        assert_eq!(reading_time(&body), 1);
    }

    #[test]
    fn prepare_allocates_slug_once() {
        let mut post = draft("My First Post!!", "some body");
        post.prepare_for_save(&Default::default());
        assert_eq!(post.slug, "my-first-post");

        // Title changes never regenerate a non-empty slug
        post.title = "A Different Title".into();
        post.prepare_for_save(&Default::default());
        assert_eq!(post.slug, "my-first-post");
    }

    #[test]
    fn prepare_keeps_explicit_excerpt() {
        let new_post = NewPost::new(
            "Title",
            &"word ".repeat(200),
            Some("hand-written summary".into()),
            PostStatus::Draft,
        )
        .unwrap();
        let mut post = Post::new(new_post);

        post.prepare_for_save(&Default::default());

        assert_eq!(post.excerpt, "hand-written summary");
    }

    #[test]
    fn prepare_recomputes_reading_time_on_every_save() {
        let mut post = draft("Title", &"word ".repeat(400));
        post.prepare_for_save(&Default::default());
        assert_eq!(post.reading_time, 2);

        post.body = "word ".repeat(1000);
        post.prepare_for_save(&Default::default());
        assert_eq!(post.reading_time, 5);
    }

    #[test]
    fn prepare_skips_derived_fields_for_empty_body() {
        let mut post = draft("Title", "");
        post.prepare_for_save(&Default::default());

        assert_eq!(post.excerpt, "");
        assert_eq!(post.reading_time, 0);
    }

    #[test]
    fn published_at_is_set_on_first_publish_only() {
        let mut post = draft("Title", "body");
        post.prepare_for_save(&Default::default());
        assert!(post.published_at.is_none());

        post.status = PostStatus::Published;
        post.prepare_for_save(&Default::default());
        let first = post.published_at.expect("published_at not set on publish");

        post.prepare_for_save(&Default::default());
        assert_eq!(post.published_at, Some(first));
    }

    #[test]
    fn overlong_title_rejected() {
        let title = "a".repeat(251);
        assert_err!(NewPost::new(&title, "body", None, PostStatus::Draft));
    }

    #[test]
    fn empty_title_accepted() {
        assert_ok!(NewPost::new("", "body", None, PostStatus::Draft));
    }

    #[test]
    fn blank_explicit_excerpt_is_treated_as_unset() {
        let new_post = NewPost::new("Title", "body", Some("   ".into()), PostStatus::Draft).unwrap();
        assert!(new_post.excerpt.is_none());
    }
}
