use std::sync::Arc;

use bytes::Bytes;
use validator::Validate;

use crate::{
    config::{MAX_IMAGE_BYTES, MAX_VIDEO_BYTES},
    error::AppError,
    media::{MediaFolder, MediaGateway},
    models::{
        upload::{AvatarResponse, AvatarUrlRequest, MediaUploadResponse},
        user::Capability,
    },
    store::Store,
    utils::jwt::Identity,
};

/// A file received from a multipart form.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub data: Bytes,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

/// Type and size limits for one kind of upload.
#[derive(Debug, Clone, Copy)]
pub struct MediaPolicy {
    pub folder: MediaFolder,
    pub mime_prefix: &'static str,
    pub max_bytes: usize,
    type_error: &'static str,
    size_error: &'static str,
}

pub const VIDEO_POLICY: MediaPolicy = MediaPolicy {
    folder: MediaFolder::Videos,
    mime_prefix: "video/",
    max_bytes: MAX_VIDEO_BYTES,
    type_error: "Only video files are allowed",
    size_error: "Video file size must be less than 100MB",
};

pub const THUMBNAIL_POLICY: MediaPolicy = MediaPolicy {
    folder: MediaFolder::Thumbnails,
    mime_prefix: "image/",
    max_bytes: MAX_IMAGE_BYTES,
    type_error: "Only image files are allowed",
    size_error: "Image file size must be less than 10MB",
};

pub const AVATAR_POLICY: MediaPolicy = MediaPolicy {
    folder: MediaFolder::Avatars,
    mime_prefix: "image/",
    max_bytes: MAX_IMAGE_BYTES,
    type_error: "Avatar must be an image file",
    size_error: "Avatar file size must be less than 10MB",
};

impl MediaPolicy {
    /// Returns the accepted content type.
    pub fn check<'a>(&self, file: &'a UploadFile) -> Result<&'a str, AppError> {
        let content_type = file
            .content_type
            .as_deref()
            .filter(|ct| ct.to_ascii_lowercase().starts_with(self.mime_prefix))
            .ok_or_else(|| AppError::BadRequest(self.type_error.to_string()))?;

        if file.data.len() > self.max_bytes {
            return Err(AppError::BadRequest(self.size_error.to_string()));
        }

        Ok(content_type)
    }
}

/// Validates uploads, forwards them to the media host and records the results.
#[derive(Clone)]
pub struct UploadOrchestrator {
    store: Arc<dyn Store>,
    media: Arc<dyn MediaGateway>,
    allow_anonymous_avatar_upload: bool,
}

impl UploadOrchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        media: Arc<dyn MediaGateway>,
        allow_anonymous_avatar_upload: bool,
    ) -> Self {
        Self {
            store,
            media,
            allow_anonymous_avatar_upload,
        }
    }

    /// Avatar upload for an explicit user, or for the caller when none is named.
    pub async fn upload_avatar(
        &self,
        file: UploadFile,
        explicit_user_id: Option<i64>,
        caller: Option<&Identity>,
    ) -> Result<AvatarResponse, AppError> {
        let target = match (explicit_user_id, caller) {
            (Some(user_id), _) => {
                self.authorize_avatar_target(user_id, caller)?;
                user_id
            }
            (None, Some(identity)) => identity.user_id,
            (None, None) => {
                return Err(AppError::BadRequest(
                    "No user ID provided and no authenticated user found. Please provide a user ID or authenticate."
                        .to_string(),
                ));
            }
        };

        self.store_avatar(file, target).await
    }

    /// Avatar upload for the user named in the path.
    pub async fn upload_avatar_for_user(
        &self,
        file: UploadFile,
        user_id: i64,
        caller: Option<&Identity>,
    ) -> Result<AvatarResponse, AppError> {
        self.authorize_avatar_target(user_id, caller)?;
        self.store_avatar(file, user_id).await
    }

    /// Points the caller's own avatar at an existing URL without uploading.
    pub async fn set_avatar_url(
        &self,
        caller: Option<&Identity>,
        payload: AvatarUrlRequest,
    ) -> Result<AvatarResponse, AppError> {
        let identity =
            caller.ok_or_else(|| AppError::AuthError("Authentication required".to_string()))?;

        payload.validate()?;

        let user = self
            .store
            .set_avatar_url(identity.user_id, &payload.avatar_url)
            .await?;

        tracing::info!(user_id = user.id, "Avatar URL updated");

        Ok(AvatarResponse {
            avatar_url: payload.avatar_url,
            user_id: user.id,
            message: "Avatar updated successfully".to_string(),
        })
    }

    pub async fn upload_video(&self, file: UploadFile) -> Result<MediaUploadResponse, AppError> {
        self.upload_media(file, VIDEO_POLICY, "Video uploaded successfully")
            .await
    }

    pub async fn upload_thumbnail(
        &self,
        file: UploadFile,
    ) -> Result<MediaUploadResponse, AppError> {
        self.upload_media(file, THUMBNAIL_POLICY, "Thumbnail uploaded successfully")
            .await
    }

    /// Anyone may set their own avatar; setting someone else's needs the
    /// `ManageAnyAvatar` capability. Anonymous callers are only let through
    /// when the deployment explicitly allows it.
    fn authorize_avatar_target(
        &self,
        target_user_id: i64,
        caller: Option<&Identity>,
    ) -> Result<(), AppError> {
        match caller {
            Some(identity) if identity.user_id == target_user_id => Ok(()),
            Some(identity) => {
                if identity.can(Capability::ManageAnyAvatar) {
                    Ok(())
                } else {
                    tracing::warn!(
                        caller = identity.user_id,
                        target = target_user_id,
                        "Refused cross-user avatar upload"
                    );
                    Err(AppError::Forbidden(
                        "You do not have permission to change another user's avatar.".to_string(),
                    ))
                }
            }
            None if self.allow_anonymous_avatar_upload => {
                tracing::warn!(
                    target = target_user_id,
                    "Anonymous avatar upload accepted for explicit user"
                );
                Ok(())
            }
            None => Err(AppError::AuthError("Authentication required".to_string())),
        }
    }

    async fn store_avatar(
        &self,
        file: UploadFile,
        user_id: i64,
    ) -> Result<AvatarResponse, AppError> {
        let content_type = AVATAR_POLICY.check(&file)?.to_string();

        // Fail before uploading so unknown users leave no orphaned files behind.
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found with ID: {}", user_id)))?;

        let uploaded = self
            .media
            .upload(file.data, &content_type, AVATAR_POLICY.folder)
            .await?;

        let user = self
            .store
            .set_avatar_url(user_id, &uploaded.secure_url)
            .await?;

        tracing::info!(user_id = user.id, public_id = %uploaded.public_id, "Avatar uploaded");

        Ok(AvatarResponse {
            avatar_url: uploaded.secure_url,
            user_id: user.id,
            message: "Avatar uploaded successfully".to_string(),
        })
    }

    async fn upload_media(
        &self,
        file: UploadFile,
        policy: MediaPolicy,
        message: &str,
    ) -> Result<MediaUploadResponse, AppError> {
        let content_type = policy.check(&file)?.to_string();

        tracing::info!(
            folder = %policy.folder,
            file_name = file.file_name.as_deref().unwrap_or("<unnamed>"),
            size = file.data.len(),
            "Uploading media"
        );

        let uploaded = self
            .media
            .upload(file.data, &content_type, policy.folder)
            .await?;

        tracing::info!(folder = %policy.folder, url = %uploaded.secure_url, "Media uploaded");

        Ok(MediaUploadResponse {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
            message: message.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(content_type: Option<&str>, len: usize) -> UploadFile {
        UploadFile {
            data: Bytes::from(vec![0u8; len]),
            content_type: content_type.map(str::to_string),
            file_name: None,
        }
    }

    #[test]
    fn rejects_wrong_or_missing_content_type() {
        assert!(matches!(
            VIDEO_POLICY.check(&file(Some("text/plain"), 10)),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            THUMBNAIL_POLICY.check(&file(None, 10)),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn enforces_size_limits_inclusively() {
        assert!(THUMBNAIL_POLICY.check(&file(Some("image/png"), MAX_IMAGE_BYTES)).is_ok());
        assert!(matches!(
            THUMBNAIL_POLICY.check(&file(Some("image/png"), MAX_IMAGE_BYTES + 1)),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn content_type_prefix_is_case_insensitive() {
        assert_eq!(
            VIDEO_POLICY.check(&file(Some("Video/MP4"), 1)).unwrap(),
            "Video/MP4"
        );
    }
}
