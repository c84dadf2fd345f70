// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use vidhub::config::Config;
use vidhub::media::{CloudinaryGateway, MediaGateway, UnconfiguredGateway};
use vidhub::models::user::{NewUser, Role};
use vidhub::routes;
use vidhub::state::AppState;
use vidhub::store::{MemoryStore, PgStore, Store};
use vidhub::utils::password::hash_password;

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let store: Arc<dyn Store> = match &config.database_url {
        Some(database_url) => {
            let pool = connect_with_retry(database_url).await;

            // Run Migrations Automatically
            tracing::info!("Running migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Migrations applied successfully.");

            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store, data will not persist");
            Arc::new(MemoryStore::new())
        }
    };

    // Seed Admin User
    if let Err(e) = seed_admin_user(store.as_ref(), &config).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    let media: Arc<dyn MediaGateway> = match &config.cloudinary {
        Some(cloudinary) => Arc::new(
            CloudinaryGateway::new(
                cloudinary.clone(),
                Duration::from_secs(config.media_upload_timeout_secs),
            )
            .expect("Failed to build Cloudinary client"),
        ),
        None => {
            tracing::warn!("Cloudinary credentials not set; uploads will fail");
            Arc::new(UnconfiguredGateway)
        }
    };

    if config.allow_anonymous_avatar_upload {
        tracing::warn!("Anonymous avatar uploads for explicit user IDs are ENABLED");
    }

    let addr = config.bind_addr;

    // Create AppState
    let state = AppState::new(config, store, media);

    // Create the Axum application router
    let app = routes::create_router(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listening address");

    // Start the server
    axum::serve(listener, app).await.expect("Server error");
}

/// Initialize Database Pool with Retry
async fn connect_with_retry(database_url: &str) -> PgPool {
    let mut retry_count = 0;
    loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
        {
            Ok(pool) => {
                tracing::info!("Database connected...");
                break pool;
            }
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}

async fn seed_admin_user(store: &dyn Store, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        if store.find_user_by_username(username).await?.is_none() {
            tracing::info!("Seeding admin user: {}", username);
            let hashed_password = hash_password(password)?;

            store
                .insert_user(NewUser {
                    username: username.clone(),
                    password_hash: hashed_password,
                    roles: vec![Role::User, Role::Admin],
                })
                .await?;
            tracing::info!("Admin user created successfully.");
        }
    }
    Ok(())
}
