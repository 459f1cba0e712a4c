use sqlx::PgExecutor;

use uuid::Uuid;

use crate::domain::{EmailAddress, NewSubscription, Subscription};
use crate::error::{Error, Result};

use super::is_unique_violation;

/// Repository for newsletter subscription records
pub struct SubscriptionRepo;

impl SubscriptionRepo {
    /// Whether an active subscription exists for the address.
    ///
    /// This is the better-error-message layer only; the unique constraint on
    /// `email` decides races that slip past it.
    #[tracing::instrument(name = "Check subscription email uniqueness", skip(executor, email))]
    pub async fn exists_by_email<'con>(
        executor: impl PgExecutor<'con>,
        email: &EmailAddress,
    ) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "select exists(select 1 from subscriptions where email = $1)",
        )
        .bind(email.as_ref())
        .fetch_one(executor)
        .await?;

        Ok(exists)
    }

    /// Insert a new active subscription keyed by a fresh opaque token.
    ///
    /// A unique violation at insert time is translated into the same
    /// `DuplicateSubscription` the pre-check produces.
    #[tracing::instrument(name = "Insert subscription", skip(executor, new_subscription))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        new_subscription: &NewSubscription,
    ) -> Result<Subscription> {
        let token = Uuid::new_v4();

        let subscription = sqlx::query_as::<_, Subscription>(
            "insert into subscriptions(token, email, consent) values ($1, $2, $3) \
             returning token, email, consent, created_at",
        )
        .bind(token)
        .bind(new_subscription.email.as_ref())
        .bind(new_subscription.consent)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::DuplicateSubscription
            } else {
                e.into()
            }
        })?;

        Ok(subscription)
    }

    #[tracing::instrument(name = "Fetch subscription by token", skip(executor))]
    pub async fn fetch_by_token<'con>(
        executor: impl PgExecutor<'con>,
        token: Uuid,
    ) -> Result<Option<Subscription>> {
        let subscription = sqlx::query_as::<_, Subscription>(
            "select token, email, consent, created_at from subscriptions where token = $1",
        )
        .bind(token)
        .fetch_optional(executor)
        .await?;

        Ok(subscription)
    }

    /// Hard-delete a subscription, returning the email address of the deleted
    /// record for the goodbye message. `None` when the token is unknown or
    /// already revoked.
    #[tracing::instrument(name = "Delete subscription by token", skip(executor))]
    pub async fn delete_by_token<'con>(
        executor: impl PgExecutor<'con>,
        token: Uuid,
    ) -> Result<Option<String>> {
        let email = sqlx::query_scalar::<_, String>(
            "delete from subscriptions where token = $1 returning email",
        )
        .bind(token)
        .fetch_optional(executor)
        .await?;

        Ok(email)
    }
}
