mod common;

use common::{TestApp, TestOptions, TestUser, spawn_app, spawn_app_with};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use vidhub::media::MediaFolder;

fn file_form(bytes: Vec<u8>, file_name: &str, mime: &str) -> Form {
    let part = Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str(mime)
        .unwrap();
    Form::new().part("file", part)
}

fn png() -> Form {
    file_form(vec![0x89, b'P', b'N', b'G', 1, 2, 3], "me.png", "image/png")
}

async fn post_form(app: &TestApp, path: &str, caller: Option<&TestUser>, form: Form) -> reqwest::Response {
    let mut request = app.client.post(app.url(path)).multipart(form);
    if let Some(user) = caller {
        request = request.header("Authorization", user.bearer());
    }
    request.send().await.expect("Failed to execute request")
}

async fn avatar_of(app: &TestApp, user_id: i64) -> Value {
    let profile: Value = app
        .client
        .get(app.url(&format!("/api/users/{}", user_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    profile["avatarUrl"].clone()
}

#[tokio::test]
async fn video_upload_is_forwarded_to_media_host() {
    let app = spawn_app().await;
    let user = app.user().await;

    let response = post_form(
        &app,
        "/api/uploads/video",
        Some(&user),
        file_form(vec![0u8; 2048], "clip.mp4", "video/mp4"),
    )
    .await;
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["url"], "https://media.test/videos/1");
    assert_eq!(body["publicId"], "videos/1");

    let uploads = app.media.uploads.lock().await;
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, MediaFolder::Videos);
    assert_eq!(uploads[0].1, "video/mp4");
    assert_eq!(uploads[0].2, 2048);
}

#[tokio::test]
async fn wrong_media_type_never_reaches_media_host() {
    let app = spawn_app().await;
    let user = app.user().await;

    let response = post_form(
        &app,
        "/api/uploads/video",
        Some(&user),
        file_form(b"hello".to_vec(), "notes.txt", "text/plain"),
    )
    .await;
    assert_eq!(response.status().as_u16(), 400);

    let response = post_form(
        &app,
        "/api/uploads/thumbnail",
        Some(&user),
        file_form(vec![0u8; 64], "clip.mp4", "video/mp4"),
    )
    .await;
    assert_eq!(response.status().as_u16(), 400);

    assert_eq!(app.media.call_count(), 0);
}

#[tokio::test]
async fn oversized_thumbnail_is_rejected() {
    let app = spawn_app().await;
    let user = app.user().await;

    let too_big = vec![0u8; 10 * 1024 * 1024 + 1];
    let response = post_form(
        &app,
        "/api/uploads/thumbnail",
        Some(&user),
        file_form(too_big, "thumb.jpg", "image/jpeg"),
    )
    .await;
    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(app.media.call_count(), 0);
}

#[tokio::test]
async fn media_uploads_require_authentication() {
    let app = spawn_app().await;

    let response = post_form(
        &app,
        "/api/uploads/video",
        None,
        file_form(vec![0u8; 16], "clip.mp4", "video/mp4"),
    )
    .await;
    assert_eq!(response.status().as_u16(), 401);
    assert_eq!(app.media.call_count(), 0);
}

#[tokio::test]
async fn missing_file_field_is_a_bad_request() {
    let app = spawn_app().await;
    let user = app.user().await;

    let form = Form::new().text("title", "no file here");
    let response = post_form(&app, "/api/uploads/thumbnail", Some(&user), form).await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn avatar_upload_updates_the_callers_profile() {
    let app = spawn_app().await;
    let user = app.user().await;

    let response = post_form(&app, "/api/uploads/avatar", Some(&user), png()).await;
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["userId"], user.id);
    assert_eq!(body["avatarUrl"], "https://media.test/avatars/1");

    assert_eq!(avatar_of(&app, user.id).await, "https://media.test/avatars/1");
}

#[tokio::test]
async fn avatar_without_any_target_is_a_bad_request() {
    let app = spawn_app().await;

    let response = post_form(&app, "/api/uploads/avatar", None, png()).await;
    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(app.media.call_count(), 0);
}

#[tokio::test]
async fn cross_user_avatar_needs_admin() {
    let app = spawn_app().await;
    let user = app.user().await;
    let victim = app.user().await;
    let admin = app.admin().await;

    let path = format!("/api/uploads/avatar/{}", victim.id);
    let response = post_form(&app, &path, Some(&user), png()).await;
    assert_eq!(response.status().as_u16(), 403);

    let path_query = format!("/api/uploads/avatar?userId={}", victim.id);
    let response = post_form(&app, &path_query, Some(&user), png()).await;
    assert_eq!(response.status().as_u16(), 403);

    assert_eq!(app.media.call_count(), 0);
    assert!(avatar_of(&app, victim.id).await.is_null());

    let response = post_form(&app, &path, Some(&admin), png()).await;
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(avatar_of(&app, victim.id).await, "https://media.test/avatars/1");
}

#[tokio::test]
async fn avatar_for_unknown_user_is_not_uploaded() {
    let app = spawn_app().await;
    let admin = app.admin().await;

    let response = post_form(&app, "/api/uploads/avatar/9999", Some(&admin), png()).await;
    assert_eq!(response.status().as_u16(), 404);
    assert_eq!(app.media.call_count(), 0);
}

#[tokio::test]
async fn anonymous_avatar_upload_depends_on_configuration() {
    let app = spawn_app().await;
    let user = app.user().await;
    let path = format!("/api/uploads/avatar?userId={}", user.id);

    let response = post_form(&app, &path, None, png()).await;
    assert_eq!(response.status().as_u16(), 401);
    assert_eq!(app.media.call_count(), 0);

    let permissive = spawn_app_with(TestOptions {
        allow_anonymous_avatar_upload: true,
        ..Default::default()
    })
    .await;
    let user = permissive.user().await;
    let path = format!("/api/uploads/avatar?userId={}", user.id);

    let response = post_form(&permissive, &path, None, png()).await;
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        avatar_of(&permissive, user.id).await,
        "https://media.test/avatars/1"
    );
}

#[tokio::test]
async fn avatar_must_be_an_image() {
    let app = spawn_app().await;
    let user = app.user().await;

    let response = post_form(
        &app,
        "/api/uploads/avatar",
        Some(&user),
        file_form(b"%PDF-1.7".to_vec(), "cv.pdf", "application/pdf"),
    )
    .await;
    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(app.media.call_count(), 0);
}

#[tokio::test]
async fn media_host_failure_maps_to_bad_gateway() {
    let app = spawn_app_with(TestOptions {
        failing_gateway: true,
        ..Default::default()
    })
    .await;
    let user = app.user().await;

    let response = post_form(&app, "/api/uploads/avatar", Some(&user), png()).await;
    assert_eq!(response.status().as_u16(), 502);
    assert_eq!(app.media.call_count(), 1);
    assert!(avatar_of(&app, user.id).await.is_null());
}

#[tokio::test]
async fn avatar_url_can_be_set_directly() {
    let app = spawn_app().await;
    let user = app.user().await;
    let url = "https://cdn.example.com/me.png";

    let response = app
        .client
        .post(app.url("/api/uploads/avatar-url"))
        .json(&serde_json::json!({ "avatarUrl": url }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = app
        .client
        .post(app.url("/api/uploads/avatar-url"))
        .header("Authorization", user.bearer())
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .client
        .post(app.url("/api/uploads/avatar-url"))
        .header("Authorization", user.bearer())
        .json(&serde_json::json!({ "avatarUrl": url }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["avatarUrl"], url);
    assert_eq!(avatar_of(&app, user.id).await, url);
    assert_eq!(app.media.call_count(), 0);
}

#[tokio::test]
async fn avatar_url_accepts_bundled_asset_paths() {
    let app = spawn_app().await;
    let user = app.user().await;

    let response = app
        .client
        .post(app.url("/api/uploads/avatar-url"))
        .header("Authorization", user.bearer())
        .json(&serde_json::json!({ "avatarUrl": "/assets/avatar.png" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(avatar_of(&app, user.id).await, "/assets/avatar.png");
}

#[tokio::test]
async fn avatar_url_rejects_script_schemes_with_a_readable_message() {
    let app = spawn_app().await;
    let user = app.user().await;

    let response = app
        .client
        .post(app.url("/api/uploads/avatar-url"))
        .header("Authorization", user.bearer())
        .json(&serde_json::json!({ "avatarUrl": "javascript:alert(1)" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let body: Value = response.json().await.unwrap();
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("path starting with '/'"));
    assert!(!error.contains("invalid_url"));
    assert!(avatar_of(&app, user.id).await.is_null());
}

#[tokio::test]
async fn malformed_user_id_query_is_a_json_bad_request() {
    let app = spawn_app().await;
    let user = app.user().await;

    let response = post_form(&app, "/api/uploads/avatar?userId=abc", Some(&user), png()).await;
    assert_eq!(response.status().as_u16(), 400);

    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
    assert_eq!(app.media.call_count(), 0);
}
