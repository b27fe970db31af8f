//! Shared fixtures for unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use scope_media::{ImageDescriptor, MediaError, MediaStore, UploadRequest};

use crate::config::ServerConfig;
use crate::server::{AppState, RelayServer};

/// App state over a fake media store.
pub(crate) fn state_with(config: ServerConfig) -> AppState {
    RelayServer::new(config, Arc::new(FakeMediaStore::default()))
        .state()
        .clone()
}

pub(crate) fn sample_image(name: &str) -> ImageDescriptor {
    ImageDescriptor {
        id: format!("mikroskop-portable-images/{name}"),
        src: format!("https://res.example.com/{name}.jpg"),
        name: name.to_owned(),
        date: "18 Oktober 2026".into(),
        tags: Vec::new(),
        width: 640,
        height: 480,
        format: "jpg".into(),
    }
}

/// A recorded upload, with the spooled bytes read at call time.
#[derive(Debug, Clone)]
pub(crate) struct RecordedUpload {
    pub original_filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// In-memory media store that records calls.
#[derive(Default)]
pub(crate) struct FakeMediaStore {
    images: Vec<ImageDescriptor>,
    fail_with: Option<fn() -> MediaError>,
    uploads: Mutex<Vec<RecordedUpload>>,
    last_list_limit: Mutex<Option<usize>>,
}

impl FakeMediaStore {
    pub(crate) fn with_images(images: Vec<ImageDescriptor>) -> Self {
        Self {
            images,
            ..Self::default()
        }
    }

    pub(crate) fn failing(make: fn() -> MediaError) -> Self {
        Self {
            fail_with: Some(make),
            ..Self::default()
        }
    }

    pub(crate) fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().clone()
    }

    pub(crate) fn last_list_limit(&self) -> Option<usize> {
        *self.last_list_limit.lock()
    }
}

#[async_trait]
impl MediaStore for FakeMediaStore {
    async fn list_recent(&self, limit: usize) -> scope_media::Result<Vec<ImageDescriptor>> {
        *self.last_list_limit.lock() = Some(limit);
        if let Some(make) = self.fail_with {
            return Err(make());
        }
        Ok(self.images.iter().take(limit).cloned().collect())
    }

    async fn upload(&self, request: &UploadRequest) -> scope_media::Result<ImageDescriptor> {
        let bytes = tokio::fs::read(&request.path).await?;
        if let Some(make) = self.fail_with {
            return Err(make());
        }
        self.uploads.lock().push(RecordedUpload {
            original_filename: request.original_filename.clone(),
            content_type: request.content_type.clone(),
            bytes,
        });
        let stem = request
            .original_filename
            .rsplit_once('.')
            .map_or(request.original_filename.as_str(), |(stem, _)| stem);
        Ok(sample_image(stem))
    }
}
