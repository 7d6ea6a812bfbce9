use std::net::TcpListener;

use anyhow::Context;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use cafe::app::{self, AppData};
use cafe::auth::compute_password_hash;
use cafe::domain::Role;
use cafe::model::NewUser;
use cafe::repo::UsersRepo;
use cafe::settings::{AdminSettings, Settings};
use cafe::telemetry;
use cafe::worker;

/// Create the first administrator when the users table is empty
async fn bootstrap_admin(pool: &PgPool, admin: &AdminSettings) -> anyhow::Result<()> {
    let (Some(email), Some(password)) = (&admin.email, &admin.password) else {
        return Ok(());
    };
    if UsersRepo::count(pool).await? > 0 {
        return Ok(());
    }

    let new_user = NewUser {
        email: email
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid admin email: {}", e))?,
        password_hash: compute_password_hash(password)?,
        role: Role::Admin,
    };
    let id = UsersRepo::insert(pool, &new_user)
        .await
        .context("Failed to create the initial administrator")?;

    tracing::info!(user_id = %id, email = %email, "Created initial administrator");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = telemetry::create_subscriber("info", std::io::stdout);
    telemetry::set_subscriber(subscriber)?;

    let settings = Settings::load()?;

    let pool = PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect_with(settings.database.with_db())
        .await
        .context("Failed to connect to the database")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    bootstrap_admin(&pool, &settings.admin).await?;

    let data = AppData::from_settings(&settings)?;

    if let Some(every) = settings.newsletter.poll_interval() {
        tokio::spawn(worker::run_newsletter_worker(
            pool.clone(),
            data.email_client.clone(),
            settings.newsletter.clone(),
            every,
        ));
    }

    let listener = TcpListener::bind(settings.app.addr())?;
    tracing::info!(addr = ?listener.local_addr()?, "Listening");

    app::run(listener, pool, data)?
        .await
        .context("Failed to run app")
}
