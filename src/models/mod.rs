// src/models/mod.rs

pub mod comment;
pub mod rating;
pub mod upload;
pub mod user;
pub mod video;
