// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::AppError,
    models::user::{Capability, Role},
};

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    /// Roles held by the user when the token was issued.
    pub roles: Vec<Role>,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// The authenticated caller of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub roles: Vec<Role>,
}

impl Identity {
    pub fn can(&self, capability: Capability) -> bool {
        self.roles.iter().any(|r| r.grants(capability))
    }

    /// Fails with `Forbidden` unless the caller holds `capability`.
    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You do not have permission to perform this action".to_string(),
            ))
        }
    }
}

impl TryFrom<Claims> for Identity {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;
        Ok(Identity {
            user_id,
            roles: claims.roles,
        })
    }
}

/// Signs a new JWT for the user.
pub fn sign_jwt(
    id: i64,
    roles: &[Role],
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    // Calculate expiration: current time + expiration_seconds
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: id.to_string(), // Store User ID in 'sub' claim
        roles: roles.to_vec(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Axum Middleware: Identity resolution.
///
/// Reads an optional 'Authorization: Bearer <token>' header. A valid token
/// injects an `Identity` into the request extensions; no header leaves the
/// request anonymous; a malformed or invalid token is rejected with 401.
pub async fn resolve_identity(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match auth_header {
        None => return next.run(req).await,
        Some(header) => match header.strip_prefix("Bearer ") {
            Some(token) => token,
            None => {
                return AppError::AuthError("Expected a Bearer token".to_string())
                    .into_response();
            }
        },
    };

    match verify_jwt(token, &config.jwt_secret).and_then(Identity::try_from) {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(e) => {
            tracing::warn!("Rejected bearer token: {}", e);
            e.into_response()
        }
    }
}

/// Axum Middleware: Authentication required.
///
/// Must be used inside `resolve_identity`. Returns 401 for anonymous requests.
pub async fn require_auth(req: Request<Body>, next: Next) -> Response {
    if req.extensions().get::<Identity>().is_none() {
        return AppError::AuthError("Authentication required".to_string()).into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_tokens_resolve_to_the_same_identity() {
        let token = sign_jwt(42, &[Role::User, Role::Admin], "s3cret", 60).unwrap();
        let identity = Identity::try_from(verify_jwt(&token, "s3cret").unwrap()).unwrap();
        assert_eq!(identity.user_id, 42);
        assert!(identity.can(Capability::ManageAnyAvatar));
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let token = sign_jwt(1, &[Role::User], "a", 60).unwrap();
        assert!(matches!(verify_jwt(&token, "b"), Err(AppError::AuthError(_))));
    }
}
