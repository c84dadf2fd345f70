// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    extract::AppJson,
    models::user::{CreateUserRequest, LoginRequest, NewUser, Role, UserProfile},
    store::Store,
    utils::{
        jwt::sign_jwt,
        password::{hash_password, verify_password},
    },
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the public profile.
pub async fn register(
    State(store): State<Arc<dyn Store>>,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;

    let user = store
        .insert_user(NewUser {
            username: payload.username,
            password_hash: hashed_password,
            roles: vec![Role::User],
        })
        .await?;

    tracing::info!(user_id = user.id, "User registered");

    Ok((StatusCode::CREATED, Json(UserProfile::from(user))))
}

/// Authenticates a user and returns a JWT token.
///
/// Verifies the username and password against the store.
/// If valid, signs a JWT token with the user's ID and roles.
pub async fn login(
    State(store): State<Arc<dyn Store>>,
    State(config): State<Config>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = store
        .find_user_by_username(&payload.username)
        .await?
        .ok_or(AppError::AuthError("Invalid username or password".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError(
            "Invalid username or password".to_string(),
        ));
    }

    let token = sign_jwt(
        user.id,
        &user.roles,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "userId": user.id,
        "roles": user.roles,
    })))
}
