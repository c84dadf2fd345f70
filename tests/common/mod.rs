#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;
use vidhub::{
    config::Config,
    media::{MediaError, MediaFolder, MediaGateway, UploadedMedia},
    models::user::{NewUser, Role},
    routes,
    state::AppState,
    store::{MemoryStore, UserRepository},
    utils::jwt::sign_jwt,
};

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

/// Media gateway double that records every call.
#[derive(Default)]
pub struct RecordingGateway {
    pub calls: AtomicUsize,
    pub uploads: Mutex<Vec<(MediaFolder, String, usize)>>,
    pub fail: bool,
}

impl RecordingGateway {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaGateway for RecordingGateway {
    async fn upload(
        &self,
        data: Bytes,
        content_type: &str,
        folder: MediaFolder,
    ) -> Result<UploadedMedia, MediaError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.uploads
            .lock()
            .await
            .push((folder, content_type.to_string(), data.len()));

        if self.fail {
            return Err(MediaError::Rejected {
                status: 503,
                message: "host unavailable".to_string(),
            });
        }

        Ok(UploadedMedia {
            secure_url: format!("https://media.test/{}/{}", folder, n),
            public_id: format!("{}/{}", folder, n),
        })
    }
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub store: Arc<MemoryStore>,
    pub media: Arc<RecordingGateway>,
}

#[derive(Default)]
pub struct TestOptions {
    pub allow_anonymous_avatar_upload: bool,
    pub failing_gateway: bool,
}

pub fn test_config(options: &TestOptions) -> Config {
    Config {
        database_url: None,
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        bind_addr: ([127, 0, 0, 1], 0).into(),
        cors_origins: vec!["http://localhost:3000".to_string()],
        admin_username: None,
        admin_password: None,
        cloudinary: None,
        media_upload_timeout_secs: 5,
        allow_anonymous_avatar_upload: options.allow_anonymous_avatar_upload,
    }
}

/// Spawns the app on a random port for testing.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(TestOptions::default()).await
}

pub async fn spawn_app_with(options: TestOptions) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let media = Arc::new(RecordingGateway {
        fail: options.failing_gateway,
        ..Default::default()
    });

    let state = AppState::new(test_config(&options), store.clone(), media.clone());
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        client: reqwest::Client::new(),
        store,
        media,
    }
}

/// A user created directly in the store, with a ready-to-use bearer token.
pub struct TestUser {
    pub id: i64,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn create_user(&self, roles: Vec<Role>) -> TestUser {
        let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
        let user = self
            .store
            .insert_user(NewUser {
                username,
                password_hash: "not-a-real-hash".to_string(),
                roles: roles.clone(),
            })
            .await
            .expect("Failed to insert test user");
        let token = sign_jwt(user.id, &roles, JWT_SECRET, 600).unwrap();
        TestUser { id: user.id, token }
    }

    pub async fn user(&self) -> TestUser {
        self.create_user(vec![Role::User]).await
    }

    pub async fn admin(&self) -> TestUser {
        self.create_user(vec![Role::User, Role::Admin]).await
    }

    pub async fn create_video(&self, uploader: &TestUser) -> i64 {
        let response = self
            .client
            .post(self.url("/api/videos"))
            .header("Authorization", uploader.bearer())
            .json(&serde_json::json!({
                "title": "Test video",
                "videoUrl": "https://media.test/videos/1",
            }))
            .send()
            .await
            .expect("Failed to create video");
        assert_eq!(response.status().as_u16(), 201);
        let body: serde_json::Value = response.json().await.unwrap();
        body["id"].as_i64().unwrap()
    }

    pub async fn post_comment(
        &self,
        author: &TestUser,
        video_id: i64,
        parent: Option<i64>,
        content: &str,
    ) -> reqwest::Response {
        self.client
            .post(self.url("/api/comments"))
            .header("Authorization", author.bearer())
            .json(&serde_json::json!({
                "content": content,
                "videoId": video_id,
                "parentCommentId": parent,
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn create_comment(
        &self,
        author: &TestUser,
        video_id: i64,
        parent: Option<i64>,
    ) -> i64 {
        let response = self.post_comment(author, video_id, parent, "A comment").await;
        assert_eq!(response.status().as_u16(), 201);
        let body: serde_json::Value = response.json().await.unwrap();
        body["id"].as_i64().unwrap()
    }

    pub async fn rate(&self, user: &TestUser, comment_id: i64, rating: &str) -> serde_json::Value {
        let response = self
            .client
            .post(self.url(&format!("/api/comments/{}/rating", comment_id)))
            .header("Authorization", user.bearer())
            .json(&serde_json::json!({ "rating": rating }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 200);
        response.json().await.unwrap()
    }
}
