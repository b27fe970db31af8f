//! # scope-media
//!
//! Upload proxy for microscope captures.
//!
//! - [`MediaStore`]: the seam the server talks to (list recent, upload)
//! - [`CloudinaryStore`]: REST client for a Cloudinary-compatible host
//! - [`UnconfiguredStore`]: answers every call with `NotConfigured`
//! - [`ImageDescriptor`]: the shape viewers receive

#![deny(unsafe_code)]

pub mod cloudinary;
pub mod date;
pub mod errors;
pub mod store;
pub mod types;

pub use cloudinary::CloudinaryStore;
pub use errors::{MediaError, Result};
pub use store::{MediaStore, UnconfiguredStore, build_store};
pub use types::{ImageDescriptor, UploadRequest};
