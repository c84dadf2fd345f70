//! Media upload gateway.
//!
//! The service never stores uploaded bytes itself; it hands them to a remote
//! media host and keeps the returned URL.

pub mod cloudinary;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;

pub use cloudinary::CloudinaryGateway;

/// Logical folder an upload is filed under on the media host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFolder {
    Avatars,
    Videos,
    Thumbnails,
}

impl MediaFolder {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaFolder::Avatars => "avatars",
            MediaFolder::Videos => "videos",
            MediaFolder::Thumbnails => "thumbnails",
        }
    }
}

impl fmt::Display for MediaFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file accepted by the media host.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedMedia {
    pub secure_url: String,
    pub public_id: String,
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media host is not configured")]
    NotConfigured,

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("media host rejected the upload ({status}): {message}")]
    Rejected { status: u16, message: String },
}

#[async_trait]
pub trait MediaGateway: Send + Sync {
    async fn upload(
        &self,
        data: Bytes,
        content_type: &str,
        folder: MediaFolder,
    ) -> Result<UploadedMedia, MediaError>;
}

/// Gateway used when no media host credentials are configured.
pub struct UnconfiguredGateway;

#[async_trait]
impl MediaGateway for UnconfiguredGateway {
    async fn upload(
        &self,
        _data: Bytes,
        _content_type: &str,
        folder: MediaFolder,
    ) -> Result<UploadedMedia, MediaError> {
        tracing::warn!(%folder, "Upload attempted without media host credentials");
        Err(MediaError::NotConfigured)
    }
}
