//! JSON export and metadata-stripped copies.

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use image::{DynamicImage, ImageFormat, RgbaImage, imageops};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::exif::{FlatMetadata, GeoCoordinate};
use crate::media::{MediaFile, MediaKind};
use crate::pipeline::{BatchState, FileRecord, UNSUPPORTED_TYPE_ERROR};

/// Serialized form of one [`FileRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub file_name: String,
    pub metadata: Option<FlatMetadata>,
    pub gps_data: Option<GeoCoordinate>,
    pub error: Option<String>,
}

pub fn export_record(record: &FileRecord) -> ExportRecord {
    ExportRecord {
        file_name: record.file.name.clone(),
        metadata: record.metadata.clone(),
        gps_data: record.gps,
        error: record.error.clone(),
    }
}

/// Every record of the batch, in batch order.
pub fn export_batch(state: &BatchState) -> Vec<ExportRecord> {
    state.iter().map(export_record).collect()
}

/// Serialize an export as JSON, pretty-printed with two-space indent when `pretty`.
pub fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.context("Failed to serialize export")
}

/// `{file_name}-metadata-{YYYY-MM-DD}.json`
pub fn single_export_name(file_name: &str, date: NaiveDate) -> String {
    format!("{file_name}-metadata-{}.json", date.format("%Y-%m-%d"))
}

/// `metadata-export-{YYYY-MM-DD}.json`
pub fn batch_export_name(date: NaiveDate) -> String {
    format!("metadata-export-{}.json", date.format("%Y-%m-%d"))
}

/// A copy of a file with embedded metadata removed where possible.
#[derive(Debug, Clone)]
pub struct SanitizedFile {
    /// `clean_` followed by the original name.
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// False when the bytes are the unmodified original (videos).
    pub stripped: bool,
}

/// Produce a metadata-free copy of `file`.
///
/// Images are decoded and repainted onto a blank canvas of the same size,
/// then re-encoded in their original format, which drops EXIF and other
/// embedded blocks. Video containers are not rewritten: their bytes come
/// back unchanged with `stripped == false`.
pub async fn sanitize(file: &MediaFile) -> Result<SanitizedFile> {
    let file_name = format!("clean_{}", file.name);

    match file.kind() {
        MediaKind::Image => {
            let bytes = file.read_bytes().await?;
            let mime = file.mime_type.clone();
            let clean = tokio::task::spawn_blocking(move || repaint_image(&bytes, &mime))
                .await
                .context("Sanitize task panicked")??;
            log::info!("Stripped metadata from {}", file.name);
            Ok(SanitizedFile {
                file_name,
                bytes: clean,
                stripped: true,
            })
        }
        MediaKind::Video => {
            log::warn!(
                "Video metadata stripping is not supported; {} is copied unchanged",
                file.name
            );
            let bytes = file.read_bytes().await?;
            Ok(SanitizedFile {
                file_name,
                bytes: bytes.to_vec(),
                stripped: false,
            })
        }
        MediaKind::Unsupported => bail!(UNSUPPORTED_TYPE_ERROR),
    }
}

fn repaint_image(bytes: &[u8], mime: &str) -> Result<Vec<u8>> {
    let source = image::load_from_memory(bytes).context("Failed to decode image for sanitizing")?;

    let mut canvas = RgbaImage::new(source.width(), source.height());
    imageops::overlay(&mut canvas, &source.to_rgba8(), 0, 0);
    let canvas = DynamicImage::ImageRgba8(canvas);

    // Formats we cannot encode fall back to PNG.
    let format = ImageFormat::from_mime_type(mime)
        .filter(|f| f.writing_enabled())
        .unwrap_or(ImageFormat::Png);
    let output = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(canvas.to_rgb8()),
        _ => canvas,
    };

    let mut buf = Cursor::new(Vec::new());
    output
        .write_to(&mut buf, format)
        .with_context(|| format!("Failed to encode sanitized {format:?} image"))?;
    Ok(buf.into_inner())
}

/// Somewhere to persist a named blob.
pub trait SaveTarget {
    /// Store `bytes` under `name`, returning where they ended up.
    fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Writes blobs into a directory, creating it on first save.
#[derive(Debug, Clone)]
pub struct DirectoryTarget {
    dir: PathBuf,
}

impl DirectoryTarget {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SaveTarget for DirectoryTarget {
    fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.dir.join(name);
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::debug!("Saved {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}
