mod email_address;
mod media_path;
mod post;
mod subscription;

/// Slug allocation for content entities
pub mod slug;

pub use email_address::EmailAddress;
pub use media_path::{media_dir, resolve_upload_path};
pub use post::{excerpt, reading_time, NewPost, Post, PostStatus};
pub use subscription::{NewSubscription, Subscription};
