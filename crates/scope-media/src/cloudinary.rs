//! Cloudinary-compatible REST client.
//!
//! Listing uses the Admin API with HTTP basic auth. Uploads are signed:
//! the upload parameters are sorted by name, joined as `k=v&k=v`, suffixed
//! with the API secret and hashed with SHA-256.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use scope_settings::MediaSettings;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::date::long_date_id;
use crate::errors::{MediaError, Result};
use crate::store::MediaStore;
use crate::types::{ImageDescriptor, UploadRequest, display_name, strip_extension};

/// Client for one cloud account and folder.
pub struct CloudinaryStore {
    client: reqwest::Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    folder: String,
}

/// One asset as returned by the list and upload endpoints.
#[derive(Debug, Deserialize)]
struct Resource {
    public_id: String,
    secure_url: String,
    #[serde(default)]
    format: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    uploaded_at: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    original_filename: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ResourceList {
    #[serde(default)]
    resources: Vec<Resource>,
}

impl Resource {
    fn date(&self) -> String {
        self.uploaded_at
            .as_deref()
            .or(self.created_at.as_deref())
            .map(long_date_id)
            .unwrap_or_default()
    }

    fn into_listed(self) -> ImageDescriptor {
        let name = display_name(self.filename.as_deref(), &self.public_id);
        self.into_descriptor(name)
    }

    fn into_uploaded(self, client_filename: &str) -> ImageDescriptor {
        let name = match self.original_filename.as_deref() {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => strip_extension(client_filename).to_string(),
        };
        self.into_descriptor(name)
    }

    fn into_descriptor(self, name: String) -> ImageDescriptor {
        let date = self.date();
        ImageDescriptor {
            id: self.public_id,
            src: self.secure_url,
            name,
            date,
            tags: self.tags.unwrap_or_default(),
            width: self.width,
            height: self.height,
            format: self.format,
        }
    }
}

impl fmt::Debug for CloudinaryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudinaryStore")
            .field("base_url", &self.base_url)
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("folder", &self.folder)
            .finish_non_exhaustive()
    }
}

impl CloudinaryStore {
    /// Build a client from settings. Fails with `NotConfigured` when a
    /// credential is missing.
    pub fn from_settings(settings: &MediaSettings) -> Result<Self> {
        let credential = |v: &Option<String>| {
            v.clone()
                .filter(|s| !s.is_empty())
                .ok_or(MediaError::NotConfigured)
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            cloud_name: credential(&settings.cloud_name)?,
            api_key: credential(&settings.api_key)?,
            api_secret: credential(&settings.api_secret)?,
            folder: settings.folder.clone(),
        })
    }

    /// Account name.
    pub fn cloud_name(&self) -> &str {
        &self.cloud_name
    }

    /// Folder uploads go to.
    pub fn folder(&self) -> &str {
        &self.folder
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1_1/{}/{path}", self.base_url, self.cloud_name)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(MediaError::Upstream {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl MediaStore for CloudinaryStore {
    #[instrument(skip(self), fields(folder = %self.folder))]
    async fn list_recent(&self, limit: usize) -> Result<Vec<ImageDescriptor>> {
        let prefix = format!("{}/", self.folder);
        let max_results = limit.to_string();
        let response = self
            .client
            .get(self.endpoint("resources/image/upload"))
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .query(&[
                ("prefix", prefix.as_str()),
                ("max_results", max_results.as_str()),
                ("tags", "true"),
                ("context", "true"),
                ("direction", "desc"),
            ])
            .send()
            .await?;
        let list: ResourceList = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| MediaError::Decode(e.to_string()))?;
        debug!(count = list.resources.len(), "listed images");
        Ok(list
            .resources
            .into_iter()
            .take(limit)
            .map(Resource::into_listed)
            .collect())
    }

    #[instrument(skip(self, request), fields(file = %request.original_filename))]
    async fn upload(&self, request: &UploadRequest) -> Result<ImageDescriptor> {
        let bytes = tokio::fs::read(&request.path).await?;
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("folder", self.folder.as_str()), ("timestamp", timestamp.as_str())],
            &self.api_secret,
        );

        let part = Part::bytes(bytes)
            .file_name(request.original_filename.clone())
            .mime_str(&request.content_type)
            .map_err(|e| MediaError::Decode(format!("invalid content type: {e}")))?;
        let form = Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", self.folder.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self
            .client
            .post(self.endpoint("image/upload"))
            .multipart(form)
            .send()
            .await?;
        let resource: Resource = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| MediaError::Decode(e.to_string()))?;
        debug!(public_id = %resource.public_id, "image uploaded");
        Ok(resource.into_uploaded(&request.original_filename))
    }
}

/// Sign upload parameters: sorted `k=v` pairs joined by `&`, then the
/// secret, hashed with SHA-256 and hex encoded.
pub fn sign_params(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_unstable_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn settings(base_url: &str) -> MediaSettings {
        MediaSettings {
            cloud_name: Some("demo".into()),
            api_key: Some("key".into()),
            api_secret: Some("secret".into()),
            base_url: base_url.to_string(),
            ..MediaSettings::default()
        }
    }

    fn spooled(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn signature_sorts_params_and_appends_secret() {
        let sig = sign_params(
            &[
                ("timestamp", "1700000000"),
                ("folder", "mikroskop-portable-images"),
            ],
            "secret",
        );
        assert_eq!(
            sig,
            "cef701b028a63c7a1a4872e5dcff2712e279e3df23e323d5b69d2b700d9e0aa5"
        );
    }

    #[test]
    fn missing_credential_is_not_configured() {
        let mut s = settings("http://localhost");
        s.api_secret = None;
        assert_matches!(
            CloudinaryStore::from_settings(&s),
            Err(MediaError::NotConfigured)
        );
    }

    #[test]
    fn debug_output_hides_credentials() {
        let mut s = settings("http://localhost");
        s.api_key = Some("key-4412".into());
        s.api_secret = Some("s3cr3t-value".into());
        let store = CloudinaryStore::from_settings(&s).unwrap();
        let out = format!("{store:?}");
        assert!(out.contains("demo"));
        assert!(!out.contains("s3cr3t-value"));
        assert!(!out.contains("key-4412"));
    }

    #[tokio::test]
    async fn list_maps_resources() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1_1/demo/resources/image/upload"))
            .and(query_param("prefix", "mikroskop-portable-images/"))
            .and(query_param("max_results", "10"))
            .and(query_param("direction", "desc"))
            .and(header("authorization", "Basic a2V5OnNlY3JldA=="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resources": [
                    {
                        "public_id": "mikroskop-portable-images/onion_cells",
                        "secure_url": "https://res.example/onion_cells.jpg",
                        "format": "jpg",
                        "width": 1600,
                        "height": 1200,
                        "created_at": "2026-10-18T08:15:00Z",
                        "tags": ["onion"]
                    },
                    {
                        "public_id": "mikroskop-portable-images/blood",
                        "secure_url": "https://res.example/blood.png",
                        "format": "png",
                        "width": 800,
                        "height": 600,
                        "uploaded_at": "2026-01-02T10:00:00Z",
                        "filename": "blood-smear"
                    }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = CloudinaryStore::from_settings(&settings(&server.uri())).unwrap();
        let images = store.list_recent(10).await.unwrap();

        assert_eq!(images.len(), 2);
        assert_eq!(images[0].id, "mikroskop-portable-images/onion_cells");
        assert_eq!(images[0].name, "onion_cells");
        assert_eq!(images[0].date, "18 Oktober 2026");
        assert_eq!(images[0].tags, vec!["onion".to_string()]);
        assert_eq!(images[1].name, "blood-smear");
        assert_eq!(images[1].date, "2 Januari 2026");
        assert!(images[1].tags.is_empty());
    }

    #[tokio::test]
    async fn list_upstream_error_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid credentials"))
            .mount(&server)
            .await;

        let store = CloudinaryStore::from_settings(&settings(&server.uri())).unwrap();
        let err = store.list_recent(10).await.unwrap_err();
        assert_matches!(err, MediaError::Upstream { status: 401, .. });
    }

    #[tokio::test]
    async fn list_garbage_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let store = CloudinaryStore::from_settings(&settings(&server.uri())).unwrap();
        assert_matches!(store.list_recent(10).await, Err(MediaError::Decode(_)));
    }

    #[tokio::test]
    async fn upload_sends_signed_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1_1/demo/image/upload"))
            .and(body_string_contains("name=\"signature\""))
            .and(body_string_contains("mikroskop-portable-images"))
            .and(body_string_contains("JPEGDATA"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "public_id": "mikroskop-portable-images/x1y2",
                "secure_url": "https://res.example/x1y2.jpg",
                "format": "jpg",
                "width": 640,
                "height": 480,
                "created_at": "2026-10-18T09:00:00Z",
                "original_filename": "slide_7"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = CloudinaryStore::from_settings(&settings(&server.uri())).unwrap();
        let file = spooled(b"JPEGDATA");
        let request = UploadRequest {
            path: file.path().to_path_buf(),
            original_filename: "slide_7.jpg".into(),
            content_type: "image/jpeg".into(),
        };
        let image = store.upload(&request).await.unwrap();
        assert_eq!(image.id, "mikroskop-portable-images/x1y2");
        assert_eq!(image.name, "slide_7");
        assert_eq!(image.date, "18 Oktober 2026");
        assert!(image.tags.is_empty());
    }

    #[tokio::test]
    async fn upload_name_falls_back_to_client_filename() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "public_id": "mikroskop-portable-images/abc",
                "secure_url": "https://res.example/abc.png",
                "format": "png",
                "width": 10,
                "height": 10
            })))
            .mount(&server)
            .await;

        let store = CloudinaryStore::from_settings(&settings(&server.uri())).unwrap();
        let file = spooled(b"PNG");
        let request = UploadRequest {
            path: file.path().to_path_buf(),
            original_filename: "leaf.sample.png".into(),
            content_type: "image/png".into(),
        };
        let image = store.upload(&request).await.unwrap();
        assert_eq!(image.name, "leaf.sample");
        assert_eq!(image.date, "");
    }

    #[tokio::test]
    async fn upload_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let store = CloudinaryStore::from_settings(&settings(&server.uri())).unwrap();
        let file = spooled(b"x");
        let request = UploadRequest {
            path: file.path().to_path_buf(),
            original_filename: "x.jpg".into(),
            content_type: "image/jpeg".into(),
        };
        assert_matches!(
            store.upload(&request).await,
            Err(MediaError::Upstream { status: 500, .. })
        );
    }

    #[tokio::test]
    async fn upload_missing_file_is_io_error() {
        let store = CloudinaryStore::from_settings(&settings("http://127.0.0.1:9")).unwrap();
        let request = UploadRequest {
            path: "/definitely/not/here.jpg".into(),
            original_filename: "here.jpg".into(),
            content_type: "image/jpeg".into(),
        };
        assert_matches!(store.upload(&request).await, Err(MediaError::Io(_)));
    }
}
