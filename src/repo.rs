mod posts;
mod subscriptions;

pub use posts::PostRepo;
pub use subscriptions::SubscriptionRepo;

/// Postgres error code for unique-constraint violations
const UNIQUE_VIOLATION: &str = "23505";

/// The storage layer's unique constraints are the authoritative backstop for
/// the check-then-act races on slug and email uniqueness; violations get
/// remapped to domain errors rather than propagated raw.
fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}
