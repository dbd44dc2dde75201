//! Create an administrator account.
//!
//! Usage: `create-superuser <email> <password>`, or set `SUPERUSER_EMAIL` and
//! `SUPERUSER_PASSWORD`.

use anyhow::{bail, Context};
use sqlx::postgres::PgPoolOptions;

use library_rental_server::{config::AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "library_rental_server=info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let email = args.next().or_else(|| std::env::var("SUPERUSER_EMAIL").ok());
    let password = args.next().or_else(|| std::env::var("SUPERUSER_PASSWORD").ok());
    let (Some(email), Some(password)) = (email, password) else {
        bail!("usage: create-superuser <email> <password>");
    };

    let config = AppConfig::load().context("Failed to load configuration")?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let state = AppState::new(&config, pool);
    let user = state
        .services
        .users
        .create_superuser(&email, &password)
        .await
        .context("Failed to create superuser")?;

    println!("Superuser {} created with id {}", user.email, user.id);
    Ok(())
}
