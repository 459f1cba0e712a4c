use actix_web::dev::HttpServiceFactory;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};

use serde::Deserialize;

use sqlx::PgPool;

use url::Url;

use uuid::Uuid;

use crate::client::{Email, EmailClient};
use crate::domain::NewSubscription;
use crate::error::{Error, Result};
use crate::repo::SubscriptionRepo;

/// Form deserialization wrapper for parsing signup submissions
#[derive(Debug, Deserialize)]
pub struct SubscribeForm {
    email: String,
    /// Checkbox value; anything but an affirmative reads as missing consent
    consent: Option<String>,
}

impl TryInto<NewSubscription> for SubscribeForm {
    type Error = Error;

    fn try_into(self) -> Result<NewSubscription> {
        let email = self.email.parse()?;
        let consent = matches!(self.consent.as_deref(), Some("on" | "true" | "1"));
        if !consent {
            return Err(Error::Validation(
                "Consent is required to subscribe".into(),
            ));
        }

        Ok(NewSubscription { email, consent })
    }
}

/// Create endpoint for new newsletter subscriptions
#[tracing::instrument(name = "Subscribe to the newsletter", skip_all)]
#[post("")]
async fn create(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    form: web::Form<SubscribeForm>,
) -> Result<impl Responder> {
    let new_subscription: NewSubscription = form.into_inner().try_into()?;

    // Pre-check for a friendlier duplicate message; the unique constraint on
    // the table decides races that slip past it, and `insert` maps that
    // violation to the same error.
    if SubscriptionRepo::exists_by_email(pool.get_ref(), &new_subscription.email).await? {
        return Err(Error::DuplicateSubscription);
    }
    let subscription = SubscriptionRepo::insert(pool.get_ref(), &new_subscription).await?;

    // The welcome email is best-effort: a delivery failure must never undo
    // or fail the signup itself.
    let unsubscribe_url = req.url_for("unsubscribe_confirm", [subscription.token.to_string()])?;
    let email = build_welcome_email(&subscription.email, &unsubscribe_url);
    if let Err(e) = email_client.send(&new_subscription.email, &email).await {
        tracing::warn!("Failed to send welcome email to new subscriber: {:#}", e);
    }

    Ok(HttpResponse::Created().json(subscription))
}

/// First phase of unsubscription: render the confirmation form without
/// touching the record, so link prefetchers and crawlers cannot unsubscribe
/// anyone by following the emailed URL.
#[tracing::instrument(name = "Show unsubscribe confirmation", skip(pool))]
#[get("/unsubscribe/{token}", name = "unsubscribe_confirm")]
async fn unsubscribe_confirm(
    pool: web::Data<PgPool>,
    path: web::Path<(Uuid,)>,
) -> Result<impl Responder> {
    let (token,) = path.into_inner();

    if SubscriptionRepo::fetch_by_token(pool.get_ref(), token)
        .await?
        .is_none()
    {
        return Err(Error::NotFound);
    }

    let body = format!(
        "<h1>Unsubscribe</h1>\
         <p>Click the button below to stop receiving the newsletter.</p>\
         <form method=\"post\" action=\"/subscriptions/unsubscribe/{}\">\
         <button type=\"submit\">Unsubscribe</button>\
         </form>",
        token
    );

    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body))
}

/// Second phase: the confirmed POST deletes the record irreversibly. The
/// token becomes invalid immediately; a repeat lands on `NotFound`.
#[tracing::instrument(name = "Perform unsubscribe", skip(pool))]
#[post("/unsubscribe/{token}")]
async fn unsubscribe(pool: web::Data<PgPool>, path: web::Path<(Uuid,)>) -> Result<impl Responder> {
    let (token,) = path.into_inner();

    let email = SubscriptionRepo::delete_by_token(pool.get_ref(), token)
        .await?
        .ok_or(Error::NotFound)?;

    let body = format!(
        "<h1>Unsubscribed</h1>\
         <p>{} will no longer receive the newsletter.</p>",
        email
    );

    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body))
}

/// Build the welcome email for a new subscriber
fn build_welcome_email(recipient: &str, unsubscribe_url: &Url) -> Email {
    let receiver = recipient.split('@').next().unwrap_or(recipient);

    let subject = "You're in! Welcome aboard!".to_string();
    let html_body = format!(
        "<h1>Welcome, {}!</h1>\
         <p>You are now subscribed to the newsletter.</p>\
         <p>Changed your mind? <a href=\"{}\">Unsubscribe</a> at any time.</p>",
        receiver, unsubscribe_url
    );
    let text_body = format!(
        "Welcome, {}!\n\nYou are now subscribed to the newsletter.\n\n\
         Changed your mind? Unsubscribe at any time: {}",
        receiver, unsubscribe_url
    );

    Email {
        subject,
        html_body,
        text_body,
    }
}

/// Subscription endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/subscriptions")
        .service(create)
        .service(unsubscribe_confirm)
        .service(unsubscribe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_email_contains_exactly_one_unsubscribe_link() {
        let token = Uuid::new_v4();
        let url = Url::parse(&format!(
            "http://127.0.0.1:8000/subscriptions/unsubscribe/{}",
            token
        ))
        .unwrap();

        let email = build_welcome_email("reader@example.com", &url);

        let finder = linkify::LinkFinder::new();
        let links: Vec<_> = finder.links(&email.text_body).collect();

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].as_str(), url.as_str());
        assert!(links[0].as_str().contains(&token.to_string()));
        assert!(email.html_body.contains(url.as_str()));
    }

    #[test]
    fn consent_must_be_affirmed() {
        let form = SubscribeForm {
            email: "reader@example.com".into(),
            consent: None,
        };
        let parsed: Result<NewSubscription> = form.try_into();
        assert!(matches!(parsed, Err(Error::Validation(_))));

        let form = SubscribeForm {
            email: "reader@example.com".into(),
            consent: Some("on".into()),
        };
        let parsed: Result<NewSubscription> = form.try_into();
        assert!(parsed.is_ok());
    }

    #[test]
    fn malformed_email_rejected_at_parse() {
        let form = SubscribeForm {
            email: "not-an-email".into(),
            consent: Some("on".into()),
        };
        let parsed: Result<NewSubscription> = form.try_into();
        assert!(matches!(parsed, Err(Error::Validation(_))));
    }
}
