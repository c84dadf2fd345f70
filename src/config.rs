// src/config.rs

use std::env;
use std::net::SocketAddr;

use dotenvy::dotenv;

/// Largest accepted video upload (100 MiB).
pub const MAX_VIDEO_BYTES: usize = 100 * 1024 * 1024;

/// Largest accepted image upload, used for thumbnails and avatars (10 MiB).
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    pub cors_origins: Vec<String>,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub cloudinary: Option<CloudinaryConfig>,
    pub media_upload_timeout_secs: u64,
    /// Lets anonymous callers set the avatar of an explicitly named user.
    pub allow_anonymous_avatar_upload: bool,
}

/// Credentials for the Cloudinary upload API.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                ]
            });

        let cloudinary = match (
            env::var("CLOUDINARY_CLOUD_NAME"),
            env::var("CLOUDINARY_API_KEY"),
            env::var("CLOUDINARY_API_SECRET"),
        ) {
            (Ok(cloud_name), Ok(api_key), Ok(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        let media_upload_timeout_secs = env::var("MEDIA_UPLOAD_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let allow_anonymous_avatar_upload = env::var("ALLOW_ANONYMOUS_AVATAR_UPLOAD")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            cors_origins,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            cloudinary,
            media_upload_timeout_secs,
            allow_anonymous_avatar_upload,
        }
    }
}
