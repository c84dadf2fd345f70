// src/handlers/mod.rs

pub mod auth;
pub mod comments;
pub mod ratings;
pub mod uploads;
pub mod users;
pub mod videos;
