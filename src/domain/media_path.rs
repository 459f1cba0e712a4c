use std::path::PathBuf;

use crate::domain::{slug, Post};

/// Top-level directory for post media, relative to the media root
const CATEGORY: &str = "blog";
/// Longest slug fragment allowed in a media directory name, to keep paths short
const MAX_SLUG_LEN: usize = 50;

/// Directory owning every blob uploaded for a post:
/// `blog/<slug-fragment[..50]>-<first-8-hex-of-uuid>`.
///
/// The fragment comes from the stored slug, which is frozen after the first
/// save; title edits therefore never move the directory, and cleanup always
/// targets what upload wrote. Before the first save (no slug yet) the
/// slugified title stands in. The UUID fragment keeps directories of posts
/// with identical titles apart without any external counter.
pub fn media_dir(post: &Post) -> PathBuf {
    let mut fragment = if post.slug.is_empty() {
        slug::slugify(&post.title)
    } else {
        post.slug.clone()
    };
    if fragment.is_empty() {
        fragment = "untitled".into();
    }
    fragment.truncate(MAX_SLUG_LEN);
    let fragment = fragment.trim_end_matches('-');

    PathBuf::from(CATEGORY).join(format!("{}-{}", fragment, slug::short_id(post.id)))
}

/// Relative storage path for a file uploaded against a post
pub fn resolve_upload_path(post: &Post, filename: &str) -> PathBuf {
    media_dir(post).join(filename)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::domain::{NewPost, PostStatus};

    use super::*;

    fn post_titled(title: &str) -> Post {
        Post::new(NewPost::new(title, "body", None, PostStatus::Draft).unwrap())
    }

    fn saved_post_titled(title: &str) -> Post {
        let mut post = post_titled(title);
        post.prepare_for_save(&Default::default());
        post
    }

    #[test]
    fn path_embeds_slug_and_uuid_fragment() {
        let post = saved_post_titled("My First Post!!");
        let expected = format!("blog/my-first-post-{}/photo.jpg", slug::short_id(post.id));

        assert_eq!(resolve_upload_path(&post, "photo.jpg"), PathBuf::from(expected));
    }

    #[test]
    fn identical_titles_resolve_to_distinct_paths() {
        let first = post_titled("Same Title");
        let second = post_titled("Same Title");

        let first_path = resolve_upload_path(&first, "photo.jpg");
        let second_path = resolve_upload_path(&second, "photo.jpg");

        assert_ne!(first_path, second_path);
    }

    #[test]
    fn resolution_is_deterministic() {
        let post = saved_post_titled("Stable");
        assert_eq!(
            resolve_upload_path(&post, "a.png"),
            resolve_upload_path(&post, "a.png"),
        );
    }

    #[test]
    fn media_dir_is_stable_across_title_edits_once_saved() {
        let mut post = saved_post_titled("Original Title");
        let before = media_dir(&post);

        post.title = "Renamed Title".into();

        assert_eq!(media_dir(&post), before);
    }

    #[test]
    fn empty_title_uses_untitled_directory() {
        let post = post_titled("");
        let path = resolve_upload_path(&post, "a.png");

        assert!(path.starts_with(format!("blog/untitled-{}", slug::short_id(post.id))));
    }

    #[test]
    fn long_titles_are_truncated_to_fifty_chars() {
        let title = "word ".repeat(40);
        let post = saved_post_titled(&title);

        let dir = media_dir(&post);
        let name = dir.file_name().unwrap().to_str().unwrap();
        let slug_part = name
            .strip_suffix(&format!("-{}", slug::short_id(post.id)))
            .unwrap();

        assert!(slug_part.len() <= 50, "slug fragment too long: {}", slug_part);
        assert!(!slug_part.ends_with('-'));
    }

    #[test]
    fn uuid_fragment_is_stable_for_an_entity() {
        let post = saved_post_titled("Title");
        let id: Uuid = post.id;

        let dir = media_dir(&post);
        let name = dir.file_name().unwrap().to_str().unwrap();

        assert!(name.ends_with(&slug::short_id(id)));
    }
}
