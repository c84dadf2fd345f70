//! Request extractors whose rejections render as `AppError`.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// JSON body. Malformed or mistyped bodies become `400 {"error": ...}`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);
