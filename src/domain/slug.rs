use std::collections::HashSet;

use uuid::Uuid;

/// Prefix for slugs of entities whose title normalizes to nothing
const FALLBACK_PREFIX: &str = "post";

/// Normalize a title to a URL-safe lowercase token.
///
/// ASCII letters and digits are kept (lowercased); runs of spaces and
/// punctuation collapse to a single hyphen; non-ASCII characters are dropped;
/// leading and trailing hyphens are trimmed. The result may be empty when the
/// title has no ASCII alphanumerics at all.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_ascii() {
            pending_hyphen = true;
        }
    }

    slug
}

/// Allocate a unique slug for an entity.
///
/// `used` must hold the slugs already taken by *other* entities of the same
/// type; the caller excludes the entity's own record so an update-in-place
/// never self-collides. Collisions are resolved by appending a fragment of
/// the entity's UUID rather than looping over numeric suffixes, so a single
/// lookup is always enough.
pub fn allocate(title: &str, id: Uuid, used: &HashSet<String>) -> String {
    let base = slugify(title);
    if base.is_empty() {
        return format!("{}-{}", FALLBACK_PREFIX, short_id(id));
    }
    if used.contains(&base) {
        return format!("{}-{}", base, short_id(id));
    }
    base
}

/// First 8 hex characters of an entity UUID, the collision-breaking fragment
pub fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}
