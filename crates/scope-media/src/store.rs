//! The media store seam.

use std::sync::Arc;

use async_trait::async_trait;
use scope_settings::MediaSettings;
use tracing::{info, warn};

use crate::cloudinary::CloudinaryStore;
use crate::errors::{MediaError, Result};
use crate::types::{ImageDescriptor, UploadRequest};

/// Hosted storage for microscope images.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Newest images in the configured folder, at most `limit`.
    async fn list_recent(&self, limit: usize) -> Result<Vec<ImageDescriptor>>;

    /// Store a spooled file and describe the new asset.
    ///
    /// The caller owns `request.path` and removes it afterwards.
    async fn upload(&self, request: &UploadRequest) -> Result<ImageDescriptor>;
}

/// Store used when no credentials are configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredStore;

#[async_trait]
impl MediaStore for UnconfiguredStore {
    async fn list_recent(&self, _limit: usize) -> Result<Vec<ImageDescriptor>> {
        Err(MediaError::NotConfigured)
    }

    async fn upload(&self, _request: &UploadRequest) -> Result<ImageDescriptor> {
        Err(MediaError::NotConfigured)
    }
}

/// Build the store described by `settings`.
///
/// Missing credentials produce an [`UnconfiguredStore`] so the relay still
/// starts; image routes then answer 503.
pub fn build_store(settings: &MediaSettings) -> Result<Arc<dyn MediaStore>> {
    if !settings.is_configured() {
        warn!("media credentials not configured, image routes disabled");
        return Ok(Arc::new(UnconfiguredStore));
    }
    let store = CloudinaryStore::from_settings(settings)?;
    info!(cloud = store.cloud_name(), folder = store.folder(), "media store configured");
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn unconfigured_store_refuses_everything() {
        let store = UnconfiguredStore;
        assert_matches!(store.list_recent(10).await, Err(MediaError::NotConfigured));
        let request = UploadRequest {
            path: PathBuf::from("/nonexistent"),
            original_filename: "a.jpg".into(),
            content_type: "image/jpeg".into(),
        };
        assert_matches!(store.upload(&request).await, Err(MediaError::NotConfigured));
    }

    #[tokio::test]
    async fn build_without_credentials_is_unconfigured() {
        let store = build_store(&MediaSettings::default()).unwrap();
        assert_matches!(store.list_recent(1).await, Err(MediaError::NotConfigured));
    }

    #[test]
    fn build_with_credentials_succeeds() {
        let settings = MediaSettings {
            cloud_name: Some("demo".into()),
            api_key: Some("key".into()),
            api_secret: Some("secret".into()),
            ..MediaSettings::default()
        };
        assert!(build_store(&settings).is_ok());
    }
}
