//! Cloudinary upload API client.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde::Deserialize;
use sha1::{Digest, Sha1};

use super::{MediaError, MediaFolder, MediaGateway, UploadedMedia};
use crate::config::CloudinaryConfig;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

pub struct CloudinaryGateway {
    config: CloudinaryConfig,
    http_client: Client,
}

impl CloudinaryGateway {
    pub fn new(config: CloudinaryConfig, timeout: Duration) -> Result<Self, MediaError> {
        let http_client = Client::builder().timeout(timeout).build()?;

        tracing::info!(cloud = %config.cloud_name, "Cloudinary gateway initialized");

        Ok(Self {
            config,
            http_client,
        })
    }

    fn upload_url(&self) -> String {
        // `auto` lets the host detect image vs video.
        format!("{}/{}/auto/upload", API_BASE, self.config.cloud_name)
    }
}

/// Signs upload parameters: SHA-1 over `k=v` pairs sorted by key and joined
/// with `&`, followed by the API secret.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    hex::encode(Sha1::digest(format!("{}{}", to_sign, api_secret).as_bytes()))
}

#[async_trait]
impl MediaGateway for CloudinaryGateway {
    async fn upload(
        &self,
        data: Bytes,
        content_type: &str,
        folder: MediaFolder,
    ) -> Result<UploadedMedia, MediaError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
            .to_string();

        let signature = sign_params(
            &[("folder", folder.as_str()), ("timestamp", &timestamp)],
            &self.config.api_secret,
        );

        let size = data.len();
        let file = Part::bytes(data.to_vec())
            .file_name(format!("upload-{}", timestamp))
            .mime_str(content_type)?;

        let form = Form::new()
            .part("file", file)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", folder.as_str())
            .text("signature", signature);

        tracing::debug!(%folder, size, "Sending upload to Cloudinary");

        let response = self
            .http_client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.error.message,
                Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            return Err(MediaError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let uploaded = response.json::<UploadedMedia>().await?;
        tracing::info!(%folder, public_id = %uploaded.public_id, "Upload stored on Cloudinary");

        Ok(uploaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_sorts_parameters_before_hashing() {
        let a = sign_params(&[("timestamp", "1315060510"), ("folder", "avatars")], "secret");
        let b = sign_params(&[("folder", "avatars"), ("timestamp", "1315060510")], "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
    }

    #[test]
    fn signature_matches_reference_digest() {
        // sha1("public_id=sample_image&timestamp=1315060510abcd")
        let sig = sign_params(
            &[("timestamp", "1315060510"), ("public_id", "sample_image")],
            "abcd",
        );
        assert_eq!(sig, "b4ad47fb4e25c7bf5f92a20089f9db59bc302313");
    }
}
