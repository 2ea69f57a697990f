use anyhow::{Context, Result, bail};
use nom_exif::{MediaParser, MediaSource, TrackInfo, TrackInfoTag};
use std::io::Cursor;
use std::sync::Arc;

use crate::media::{FileSource, MediaFile};

/// Intrinsic properties of a decoded image or video.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MediaProperties {
    pub width: u32,
    pub height: u32,
    /// Playback duration in seconds (videos only).
    pub duration: Option<f64>,
}

/// Reads pixel dimensions and duration from media files.
///
/// Failures here mean the file cannot be decoded at all and are reported
/// as the file's error.
#[async_trait::async_trait]
pub trait MediaProber: Send + Sync {
    /// Width and height of an image, given its bytes.
    async fn probe_image(&self, file: &MediaFile, bytes: Arc<[u8]>) -> Result<MediaProperties>;
    /// Width, height and duration of a video.
    async fn probe_video(&self, file: &MediaFile) -> Result<MediaProperties>;
}

/// Default prober: `image` for still images, `nom-exif` track parsing for videos.
#[derive(Debug, Default)]
pub struct DefaultProber;

impl DefaultProber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl MediaProber for DefaultProber {
    async fn probe_image(&self, _file: &MediaFile, bytes: Arc<[u8]>) -> Result<MediaProperties> {
        tokio::task::spawn_blocking(move || image_dimensions(&bytes))
            .await
            .context("Image probe task failed")?
    }

    async fn probe_video(&self, file: &MediaFile) -> Result<MediaProperties> {
        let source = file.source.clone();
        tokio::task::spawn_blocking(move || video_properties(&source))
            .await
            .context("Video probe task failed")?
    }
}

fn image_dimensions(bytes: &[u8]) -> Result<MediaProperties> {
    let (width, height) = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("Failed to load image for EXIF extraction")?
        .into_dimensions()
        .context("Failed to load image for EXIF extraction")?;
    Ok(MediaProperties {
        width,
        height,
        duration: None,
    })
}

fn video_properties(source: &FileSource) -> Result<MediaProperties> {
    let mut parser = MediaParser::new();
    let info: TrackInfo = match source {
        FileSource::Path(path) => {
            let ms = MediaSource::file_path(path).context("Failed to load video metadata")?;
            if !ms.has_track() {
                bail!("Failed to load video metadata: no track information");
            }
            parser.parse(ms).context("Failed to load video metadata")?
        }
        FileSource::Memory(bytes) => {
            let ms = MediaSource::seekable(Cursor::new(&bytes[..]))
                .context("Failed to load video metadata")?;
            if !ms.has_track() {
                bail!("Failed to load video metadata: no track information");
            }
            parser.parse(ms).context("Failed to load video metadata")?
        }
    };
    properties_from_track(&info)
}

fn track_number(info: &TrackInfo, tag: TrackInfoTag) -> Option<u64> {
    info.get(tag)
        .map(|v| v.to_string())
        .and_then(|s| s.trim().trim_matches('"').parse::<u64>().ok())
}

fn properties_from_track(info: &TrackInfo) -> Result<MediaProperties> {
    let (Some(width), Some(height)) = (
        track_number(info, TrackInfoTag::ImageWidth),
        track_number(info, TrackInfoTag::ImageHeight),
    ) else {
        bail!("Failed to load video metadata: no video dimensions");
    };
    let duration = track_number(info, TrackInfoTag::DurationMs).map(|ms| ms as f64 / 1000.0);

    Ok(MediaProperties {
        width: u32::try_from(width).context("Video width out of range")?,
        height: u32::try_from(height).context("Video height out of range")?,
        duration,
    })
}
