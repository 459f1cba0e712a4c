use std::net::TcpListener;

use anyhow::Context;

use sqlx::PgPool;

use portfolio::client::EmailClient;
use portfolio::settings::Settings;
use portfolio::storage::MediaStore;
use portfolio::{app, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = telemetry::create_subscriber("info", std::io::stdout);
    telemetry::set_subscriber(subscriber)?;

    let settings = Settings::load().context("Failed to load settings")?;

    let pool = PgPool::connect_with(settings.database.with_db()).await?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let email_client = EmailClient::new(
        settings.email.sender(),
        settings.email.api_timeout(),
        settings.email.api_base_url(),
        settings.email.api_auth_token(),
    )?;
    let media_store = MediaStore::new(settings.media.root());

    let listener = TcpListener::bind(settings.app.addr())?;

    app::run(listener, pool, email_client, media_store)?
        .await
        .context("Failed to run app")
}
