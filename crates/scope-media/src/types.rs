//! Image descriptors and upload requests.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A stored image as shown to viewers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    /// Host-assigned public id (includes the folder prefix).
    pub id: String,
    /// HTTPS delivery URL.
    pub src: String,
    /// Display name.
    pub name: String,
    /// Upload date, long Indonesian form (`18 Oktober 2026`).
    pub date: String,
    /// Tags attached on the host.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
    /// File format (`jpg`, `png`, ...).
    pub format: String,
}

/// A file spooled to disk, ready to be sent to the host.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Path of the spooled file.
    pub path: PathBuf,
    /// Filename supplied by the client.
    pub original_filename: String,
    /// MIME type supplied by the client.
    pub content_type: String,
}

/// Display name for an asset: the explicit name if any, otherwise the last
/// path segment of `fallback` with its extension removed.
pub fn display_name(explicit: Option<&str>, fallback: &str) -> String {
    if let Some(name) = explicit.filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    let segment = fallback.rsplit('/').next().unwrap_or(fallback);
    strip_extension(segment).to_string()
}

/// `photo.final.jpg` → `photo.final`; names without a dot are unchanged.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_name_wins() {
        assert_eq!(display_name(Some("slide-3"), "folder/abc"), "slide-3");
    }

    #[test]
    fn fallback_uses_last_segment() {
        assert_eq!(
            display_name(None, "mikroskop-portable-images/cell_sample"),
            "cell_sample"
        );
        assert_eq!(display_name(Some(""), "a/b/c.png"), "c");
    }

    #[test]
    fn strip_extension_cases() {
        assert_eq!(strip_extension("photo.final.jpg"), "photo.final");
        assert_eq!(strip_extension("noext"), "noext");
        assert_eq!(strip_extension(".hidden"), ".hidden");
    }

    #[test]
    fn descriptor_serializes_flat() {
        let d = ImageDescriptor {
            id: "f/x".into(),
            src: "https://cdn/x.jpg".into(),
            name: "x".into(),
            date: "1 Januari 2026".into(),
            tags: vec![],
            width: 640,
            height: 480,
            format: "jpg".into(),
        };
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["src"], "https://cdn/x.jpg");
        assert_eq!(v["tags"], serde_json::json!([]));
        assert_eq!(v["width"], 640);
    }
}
