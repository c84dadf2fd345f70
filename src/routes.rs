// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::MAX_VIDEO_BYTES,
    handlers::{auth, comments, ratings, uploads, users, videos},
    state::AppState,
    utils::jwt::{require_auth, resolve_identity},
};

/// Room for multipart boundaries and headers on top of the largest file.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, users, videos, comments, uploads).
/// * Applies global middleware (Trace, CORS, identity resolution).
/// * Injects global state.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let user_routes = Router::new()
        .route("/{id}", get(users::get_user))
        .route("/{id}/comments", get(users::list_user_comments));

    let video_routes = Router::new()
        .route("/", get(videos::list_videos))
        .route("/{id}", get(videos::get_video))
        .route("/{id}/comments", get(videos::list_video_comments))
        // Protected video routes
        .merge(
            Router::new()
                .route("/", post(videos::create_video))
                .layer(middleware::from_fn(require_auth)),
        );

    let comment_routes = Router::new()
        .route("/{id}", get(comments::get_comment))
        .route("/{id}/rating", get(ratings::get_comment_rating))
        // Protected comment routes
        .merge(
            Router::new()
                .route(
                    "/",
                    post(comments::create_comment).get(comments::list_all_comments),
                )
                .route("/{id}", delete(comments::delete_comment))
                .route(
                    "/{id}/rating",
                    post(ratings::rate_comment).delete(ratings::delete_comment_rating),
                )
                .layer(middleware::from_fn(require_auth)),
        );

    let upload_routes = Router::new()
        // Avatar routes decide about anonymous callers themselves
        .route("/avatar", post(uploads::upload_avatar))
        .route("/avatar/{user_id}", post(uploads::upload_avatar_for_user))
        .route("/avatar-url", post(uploads::set_avatar_url))
        .merge(
            Router::new()
                .route("/video", post(uploads::upload_video))
                .route("/thumbnail", post(uploads::upload_thumbnail))
                .layer(middleware::from_fn(require_auth)),
        )
        .layer(DefaultBodyLimit::max(MAX_VIDEO_BYTES + MULTIPART_OVERHEAD));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/videos", video_routes)
        .nest("/api/comments", comment_routes)
        .nest("/api/uploads", upload_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    resolve_identity,
                )),
        )
        .with_state(state)
}
