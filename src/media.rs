use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::exif::FlatMetadata;

/// Coarse media kind, taken from the MIME type prefix.
///
/// ```rust
/// use media_lens::media::MediaKind;
///
/// assert_eq!(MediaKind::from_mime("image/jpeg"), MediaKind::Image);
/// assert_eq!(MediaKind::from_mime("video/quicktime"), MediaKind::Video);
/// assert_eq!(MediaKind::from_mime("application/pdf"), MediaKind::Unsupported);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Unsupported,
}

impl MediaKind {
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            Self::Image
        } else if mime.starts_with("video/") {
            Self::Video
        } else {
            Self::Unsupported
        }
    }
}

/// Map a file extension to a MIME type.
///
/// Unknown extensions map to `application/octet-stream`, which classifies
/// as [`MediaKind::Unsupported`].
pub fn mime_from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "avif" => "image/avif",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "3gp" => "video/3gpp",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

/// Where a file's bytes live.
#[derive(Debug, Clone)]
pub enum FileSource {
    Path(PathBuf),
    Memory(Arc<[u8]>),
}

/// A user-supplied file handle: intrinsic properties plus readable bytes.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub last_modified: DateTime<Utc>,
    pub source: FileSource,
}

impl MediaFile {
    /// Open a file on disk. Reads filesystem metadata only; bytes are loaded on demand.
    pub fn from_path(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path)
            .with_context(|| format!("Failed to stat {}", path.display()))?;
        let last_modified = meta.modified().map(DateTime::<Utc>::from).unwrap_or_default();

        Ok(Self {
            name: file_name(path),
            size: meta.len(),
            mime_type: mime_from_path(path).to_string(),
            last_modified,
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    /// Handle for a path whose filesystem metadata could not be read.
    ///
    /// Size is zero and the timestamp is the epoch; reading the bytes fails,
    /// so extraction turns it into an error record.
    pub fn unreadable(path: &Path) -> Self {
        Self {
            name: file_name(path),
            size: 0,
            mime_type: mime_from_path(path).to_string(),
            last_modified: DateTime::<Utc>::default(),
            source: FileSource::Path(path.to_path_buf()),
        }
    }

    /// Wrap bytes that are already in memory.
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
        last_modified: DateTime<Utc>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            mime_type: mime_type.into(),
            last_modified,
            source: FileSource::Memory(bytes),
        }
    }

    pub fn kind(&self) -> MediaKind {
        MediaKind::from_mime(&self.mime_type)
    }

    /// Load the file's bytes.
    pub async fn read_bytes(&self) -> Result<Arc<[u8]>> {
        match &self.source {
            FileSource::Path(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                Ok(bytes.into())
            }
            FileSource::Memory(bytes) => Ok(Arc::clone(bytes)),
        }
    }

    /// The intrinsic fields every record starts from: `name`, `size`, `type`, `lastModified`.
    pub fn base_info(&self) -> FlatMetadata {
        let mut info = FlatMetadata::new();
        info.insert("name", Value::from(self.name.clone()));
        info.insert("size", Value::from(self.size));
        info.insert("type", Value::from(self.mime_type.clone()));
        info.insert(
            "lastModified",
            Value::from(self.last_modified.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        info
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
