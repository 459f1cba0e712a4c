use chrono::{DateTime, Utc};

use serde::Serialize;

use uuid::Uuid;

use crate::domain::EmailAddress;

/// New subscription request, parsed from the signup form
#[derive(Debug)]
pub struct NewSubscription {
    pub email: EmailAddress,
    pub consent: bool,
}

/// Stored subscription record.
///
/// Active from creation until hard-deleted by a confirmed unsubscribe; there
/// is at most one record per email address, enforced by a unique constraint.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Subscription {
    /// Opaque token: both the primary key and the unsubscribe-link credential
    pub token: Uuid,
    pub email: String,
    pub consent: bool,
    pub created_at: DateTime<Utc>,
}
