use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::config::{Config, GpsConfig, ScanConfig};
use crate::display::{Category, categorize};
use crate::exif::{FlatMetadata, GeoCoordinate, NomExifDecoder, TagDecoder, flatten, resolve_gps};
use crate::media::{MediaFile, MediaKind, mime_from_path};
use crate::preview::{PreviewHandle, PreviewRegistry};
use crate::probe::{DefaultProber, MediaProber};

/// Error stored on records whose MIME type is neither image nor video.
pub const UNSUPPORTED_TYPE_ERROR: &str =
    "Unsupported file type. Please select an image or video file.";

/// Position to hand to a map widget.
#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub latitude: f64,
    pub longitude: f64,
    pub title: Option<String>,
}

/// The result of extracting one file.
///
/// A record either carries metadata (possibly with a coordinate) or an
/// error description, never both. Its preview handle is released when the
/// record is dropped.
#[derive(Debug)]
pub struct FileRecord {
    pub file: MediaFile,
    pub metadata: Option<FlatMetadata>,
    pub gps: Option<GeoCoordinate>,
    pub error: Option<String>,
    preview: PreviewHandle,
}

impl FileRecord {
    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Categorized metadata; empty for error records.
    pub fn categories(&self) -> Vec<Category> {
        self.metadata.as_ref().map(categorize).unwrap_or_default()
    }

    /// A marker only exists for records with a resolved coordinate.
    pub fn map_marker(&self) -> Option<MapMarker> {
        self.gps.map(|gps| MapMarker {
            latitude: gps.latitude,
            longitude: gps.longitude,
            title: Some(self.file.name.clone()),
        })
    }
}

/// The records of the current batch, in input order.
#[derive(Debug, Default)]
pub struct BatchState {
    records: Vec<FileRecord>,
}

impl BatchState {
    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&FileRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every record, releasing their preview handles. Returns how many were released.
    pub fn release(&mut self) -> usize {
        let released = self.records.len();
        self.records.clear();
        released
    }
}

/// Metadata and coordinate extracted from one decodable file.
struct Extracted {
    metadata: FlatMetadata,
    gps: Option<GeoCoordinate>,
}

fn insert_number(meta: &mut FlatMetadata, key: &str, n: impl Into<Value>) {
    meta.insert(key, n.into());
}

async fn extract_image(
    file: &MediaFile,
    decoder: &dyn TagDecoder,
    prober: &dyn MediaProber,
    gps_config: &GpsConfig,
) -> Result<Extracted> {
    let bytes = file.read_bytes().await?;
    let props = prober.probe_image(file, Arc::clone(&bytes)).await?;

    let mut intrinsic = file.base_info();
    insert_number(&mut intrinsic, "width", props.width);
    insert_number(&mut intrinsic, "height", props.height);

    match decoder.decode(bytes).await {
        Ok(tags) => {
            let gps = resolve_gps(&tags, gps_config);
            if gps.is_none() {
                log::debug!("No usable GPS position in {}", file.name);
            }
            Ok(Extracted {
                metadata: flatten(intrinsic, &tags),
                gps,
            })
        }
        Err(e) => {
            log::warn!("{} could not decode tags in {}: {e:#}", decoder.name(), file.name);
            Ok(Extracted {
                metadata: intrinsic,
                gps: None,
            })
        }
    }
}

async fn extract_video(file: &MediaFile, prober: &dyn MediaProber) -> Result<Extracted> {
    let props = prober.probe_video(file).await?;

    let mut metadata = file.base_info();
    if let Some(duration) = props.duration {
        insert_number(&mut metadata, "duration", duration);
    }
    insert_number(&mut metadata, "width", props.width);
    insert_number(&mut metadata, "height", props.height);

    Ok(Extracted { metadata, gps: None })
}

/// Extract one file into a record. Never fails: problems become the record's error.
///
/// Any temporary handle opened for decoding is released before returning.
pub async fn extract_file(
    file: MediaFile,
    decoder: &dyn TagDecoder,
    prober: &dyn MediaProber,
    registry: &PreviewRegistry,
    gps_config: &GpsConfig,
) -> FileRecord {
    let preview = registry.acquire(&file);

    let outcome = match file.kind() {
        MediaKind::Image => {
            let _decode_handle = registry.acquire(&file);
            Some(extract_image(&file, decoder, prober, gps_config).await)
        }
        MediaKind::Video => {
            let _decode_handle = registry.acquire(&file);
            Some(extract_video(&file, prober).await)
        }
        MediaKind::Unsupported => None,
    };

    let (metadata, gps, error) = match outcome {
        Some(Ok(extracted)) => (Some(extracted.metadata), extracted.gps, None),
        Some(Err(e)) => {
            log::warn!("Failed to read {}: {e:#}", file.name);
            (None, None, Some(format!("Error reading metadata: {e:#}")))
        }
        None => {
            log::warn!("Unsupported file type {:?} for {}", file.mime_type, file.name);
            (None, None, Some(UNSUPPORTED_TYPE_ERROR.to_string()))
        }
    };

    FileRecord {
        file,
        metadata,
        gps,
        error,
        preview,
    }
}

/// Runs batches of files through extraction, one file at a time.
///
/// The pipeline owns the current [`BatchState`]. Submitting a new batch
/// releases the previous one first; dropping the pipeline releases whatever
/// is left.
///
/// # Example
///
/// ```rust,no_run
/// use media_lens::config::Config;
/// use media_lens::media::MediaFile;
/// use media_lens::pipeline::BatchPipeline;
/// use std::path::Path;
///
/// # async fn example() -> anyhow::Result<()> {
/// let mut pipeline = BatchPipeline::from_config(&Config::default());
/// let files = vec![MediaFile::from_path(Path::new("photo.jpg"))?];
///
/// let state = pipeline
///     .submit(files, |state| println!("{} done", state.len()))
///     .await;
/// for record in state.iter() {
///     match &record.error {
///         Some(err) => println!("{}: {err}", record.file.name),
///         None => println!("{}: {} categories", record.file.name, record.categories().len()),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct BatchPipeline {
    decoder: Box<dyn TagDecoder>,
    prober: Box<dyn MediaProber>,
    registry: PreviewRegistry,
    gps: GpsConfig,
    state: BatchState,
}

impl BatchPipeline {
    pub fn new(decoder: Box<dyn TagDecoder>, prober: Box<dyn MediaProber>, gps: GpsConfig) -> Self {
        Self {
            decoder,
            prober,
            registry: PreviewRegistry::new(),
            gps,
            state: BatchState::default(),
        }
    }

    /// Pipeline with the `nom-exif` decoder and the default prober.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Box::new(NomExifDecoder::new()),
            Box::new(DefaultProber::new()),
            config.gps.clone(),
        )
    }

    pub fn registry(&self) -> &PreviewRegistry {
        &self.registry
    }

    pub fn state(&self) -> &BatchState {
        &self.state
    }

    /// Record at `index` in the current batch.
    pub fn record(&self, index: usize) -> Option<&FileRecord> {
        self.state.get(index)
    }

    /// Discard the current batch. Returns the number of records released.
    pub fn clear(&mut self) -> usize {
        let released = self.state.release();
        if released > 0 {
            log::debug!("Released {released} preview handle(s)");
        }
        released
    }

    /// Extract a single file with this pipeline's collaborators.
    pub async fn extract_file(&self, file: MediaFile) -> FileRecord {
        extract_file(
            file,
            self.decoder.as_ref(),
            self.prober.as_ref(),
            &self.registry,
            &self.gps,
        )
        .await
    }

    /// Replace the current batch with `files`, processed in order.
    ///
    /// `on_progress` sees the growing state after every file. The returned
    /// state always holds exactly one record per input file.
    pub async fn submit<F>(&mut self, files: Vec<MediaFile>, mut on_progress: F) -> &BatchState
    where
        F: FnMut(&BatchState),
    {
        self.clear();

        let total = files.len();
        self.state.records.reserve(total);
        for (i, file) in files.into_iter().enumerate() {
            log::info!("[{}/{}] Processing: {}", i + 1, total, file.name);
            let record = self.extract_file(file).await;
            if let Some(ref err) = record.error {
                log::error!("  Error: {err}");
            }
            self.state.records.push(record);
            on_progress(&self.state);
        }

        let failed = self.state.iter().filter(|r| !r.is_ok()).count();
        log::info!(
            "Done: {} succeeded, {failed} failed out of {total} files",
            total - failed
        );
        &self.state
    }
}

/// Collect media files from the given paths.
///
/// Explicit file paths are always kept, so unsupported files still get an
/// error record. Directories are walked (only one level unless
/// `scan.recursive` is set) and
/// only files with image or video extensions are kept.
///
/// # Example
///
/// ```rust,no_run
/// use media_lens::config::ScanConfig;
/// use media_lens::pipeline::collect_media;
/// use std::path::PathBuf;
///
/// let files = collect_media(
///     &[PathBuf::from("photo.jpg"), PathBuf::from("./videos/")],
///     &ScanConfig::default(),
/// );
/// println!("Found {} files", files.len());
/// ```
pub fn collect_media(paths: &[PathBuf], scan: &ScanConfig) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            let mut walker = WalkDir::new(path)
                .follow_links(scan.follow_links)
                .sort_by_file_name();
            if !scan.recursive {
                walker = walker.max_depth(1);
            }
            for entry in walker.into_iter().filter_map(|e| e.ok()) {
                let p = entry.path();
                if p.is_file() && is_supported_media(p) {
                    files.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    files
}

/// Check if a file has an image or video extension.
fn is_supported_media(path: &Path) -> bool {
    MediaKind::from_mime(mime_from_path(path)) != MediaKind::Unsupported
}
