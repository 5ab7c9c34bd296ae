//! Attachment uploads that must complete before the owning mutation is sent.
//!
//! A local preview (data URL) is available immediately for display, but it is
//! a different type from [`RemoteUrl`] and can never be stored as the
//! canonical value. Uploads validate type and size before touching the
//! network; a failed upload can simply be retried from scratch.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use serde::Serialize;
use thiserror::Error;

use crate::api::{ApiClient, ApiError, ApiRequest, FilePart, Transport};
use crate::normalize::normalize_upload_url;

pub const IMAGE_MAX_BYTES: usize = 5 * 1024 * 1024;
pub const DOCUMENT_MAX_BYTES: usize = 10 * 1024 * 1024;

const IMAGE_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];
const DOCUMENT_MIME_TYPES: [&str; 1] = ["application/pdf"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadKind {
    Image,
    Document,
}

impl UploadKind {
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Image => "/api/upload/image",
            Self::Document => "/api/upload/document",
        }
    }

    /// Multipart field carrying the file.
    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Document => "document",
        }
    }

    #[must_use]
    pub const fn max_bytes(self) -> usize {
        match self {
            Self::Image => IMAGE_MAX_BYTES,
            Self::Document => DOCUMENT_MAX_BYTES,
        }
    }

    #[must_use]
    pub const fn accepted_mime_types(self) -> &'static [&'static str] {
        match self {
            Self::Image => &IMAGE_MIME_TYPES,
            Self::Document => &DOCUMENT_MIME_TYPES,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Document => "document",
        }
    }
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A file picked by the user, held in memory until uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct LocalFile {
    file_name: String,
    mime_type: String,
    bytes: Vec<u8>,
}

impl LocalFile {
    pub fn new(file_name: impl Into<String>, content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into().trim().to_string();
        let mime_type = infer_mime_type(content_type, &file_name);
        Self {
            file_name,
            mime_type,
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> crate::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(file_name, None, bytes))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for LocalFile {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LocalFile")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Display-only data URL of a file that has not been uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct LocalPreview(String);

impl LocalPreview {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for LocalPreview {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head: String = self.0.chars().take(32).collect();
        write!(formatter, "LocalPreview({head}...)")
    }
}

/// A canonical URL returned by the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RemoteUrl(String);

impl RemoteUrl {
    /// Accepts server paths and absolute URLs; rejects browser-local URLs.
    pub fn parse(raw: impl Into<String>) -> Result<Self, UploadError> {
        let raw = raw.into().trim().to_string();
        let lowered = raw.to_ascii_lowercase();
        if raw.is_empty() || lowered.starts_with("data:") || lowered.starts_with("blob:") {
            return Err(UploadError::LocalUrl);
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RemoteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file bound to the payload field that receives its uploaded URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file: LocalFile,
    pub kind: UploadKind,
    pub field: String,
}

impl Attachment {
    pub fn image(file: LocalFile, field: impl Into<String>) -> Self {
        Self {
            file,
            kind: UploadKind::Image,
            field: field.into(),
        }
    }

    pub fn document(file: LocalFile, field: impl Into<String>) -> Self {
        Self {
            file,
            kind: UploadKind::Document,
            field: field.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("{file_name} is empty")]
    Empty { file_name: String },
    #[error("{kind} must be one of: {accepted} (got {mime_type})")]
    UnsupportedType {
        kind: UploadKind,
        mime_type: String,
        accepted: String,
    },
    #[error("{kind} must not exceed {max_mb} MB")]
    TooLarge {
        kind: UploadKind,
        size: usize,
        max_mb: usize,
    },
    #[error("upload did not return a stored URL")]
    LocalUrl,
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl UploadError {
    /// Failures detected before any network call.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Empty { .. } | Self::UnsupportedType { .. } | Self::TooLarge { .. }
        )
    }
}

/// Check type and size preconditions for `kind`.
pub fn validate_file(file: &LocalFile, kind: UploadKind) -> Result<(), UploadError> {
    if file.is_empty() {
        return Err(UploadError::Empty {
            file_name: file.file_name().to_string(),
        });
    }
    let mime_type = file.mime_type().to_ascii_lowercase();
    if !kind.accepted_mime_types().contains(&mime_type.as_str()) {
        return Err(UploadError::UnsupportedType {
            kind,
            mime_type,
            accepted: kind.accepted_mime_types().join(", "),
        });
    }
    if file.len() > kind.max_bytes() {
        return Err(UploadError::TooLarge {
            kind,
            size: file.len(),
            max_mb: kind.max_bytes() / (1024 * 1024),
        });
    }
    Ok(())
}

pub struct UploadCoordinator<T: Transport> {
    api: Arc<ApiClient<T>>,
}

impl<T: Transport> UploadCoordinator<T> {
    pub const fn new(api: Arc<ApiClient<T>>) -> Self {
        Self { api }
    }

    /// Build a data URL for immediate display; performs no network call.
    pub fn stage_local_preview(file: &LocalFile) -> LocalPreview {
        let encoded = BASE64_STANDARD.encode(file.bytes());
        LocalPreview(format!("data:{};base64,{encoded}", file.mime_type()))
    }

    /// Upload `file` and return its canonical URL.
    pub async fn upload(&self, file: &LocalFile, kind: UploadKind) -> Result<RemoteUrl, UploadError> {
        validate_file(file, kind)?;

        let request = ApiRequest::post(kind.endpoint()).with_file(FilePart {
            field: kind.field().to_string(),
            file_name: file.file_name().to_string(),
            mime_type: file.mime_type().to_string(),
            bytes: file.bytes().to_vec(),
        });
        let response = self.api.send(request).await?;
        let url = RemoteUrl::parse(normalize_upload_url(&response)?)?;

        tracing::info!(
            file_name = file.file_name(),
            size = file.len(),
            %kind,
            url = url.as_str(),
            "Uploaded attachment"
        );
        Ok(url)
    }
}

/// Resolve a MIME type from the declared content type, falling back to the
/// file extension when the declaration is missing or generic.
pub fn infer_mime_type(content_type: Option<&str>, file_name: &str) -> String {
    if let Some(content_type) = content_type {
        let normalized = content_type.trim().to_ascii_lowercase();
        if !normalized.is_empty() && normalized != "application/octet-stream" {
            return match normalized.as_str() {
                "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
                _ => normalized,
            };
        }
    }

    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
