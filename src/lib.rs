//! # media-lens
//!
//! Media metadata viewer: extract EXIF tags and container properties from images and
//! videos, group them into readable categories, resolve GPS positions, and export or
//! strip the results.
//!
//! ## Quick Start
//!
//! The batch pipeline handles the full read → decode → flatten → categorize flow.
//! Every input file produces exactly one record, even when it fails:
//!
//! ```rust,no_run
//! use media_lens::config::Config;
//! use media_lens::media::MediaFile;
//! use media_lens::pipeline::{BatchPipeline, collect_media};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!
//!     // Gather files from paths (files or directories)
//!     let paths = collect_media(&[PathBuf::from("./photos")], &config.scan);
//!     let files = paths
//!         .iter()
//!         .map(|p| MediaFile::from_path(p))
//!         .collect::<anyhow::Result<Vec<_>>>()?;
//!
//!     let mut pipeline = BatchPipeline::from_config(&config);
//!     let state = pipeline.submit(files, |_| {}).await;
//!
//!     for record in state.iter() {
//!         if let Some(ref err) = record.error {
//!             eprintln!("{}: {err}", record.file.name);
//!             continue;
//!         }
//!         for category in record.categories() {
//!             println!("{} ({}): {}", category.name, category.count, category.preview);
//!         }
//!         if let Some(marker) = record.map_marker() {
//!             println!("  at {:.6}, {:.6}", marker.latitude, marker.longitude);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! The decoder, flattener, and GPS resolver can be driven individually:
//!
//! ```rust,no_run
//! use media_lens::config::GpsConfig;
//! use media_lens::exif::{NomExifDecoder, TagDecoder, flatten, resolve_gps};
//! use media_lens::media::MediaFile;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let file = MediaFile::from_path(Path::new("photo.jpg"))?;
//!     let tags = NomExifDecoder::new().decode(file.read_bytes().await?).await?;
//!
//!     let metadata = flatten(file.base_info(), &tags);
//!     println!("Camera: {:?}", metadata.get("Model"));
//!
//!     if let Some(gps) = resolve_gps(&tags, &GpsConfig::default()) {
//!         println!("Taken at {}, {}", gps.latitude, gps.longitude);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Formats
//!
//! | Kind | Extensions | Metadata |
//! |------|------------|----------|
//! | Image | `.jpg`, `.jpeg`, `.png`, `.webp`, `.gif`, `.bmp`, `.tif`, `.tiff` | Dimensions + EXIF tags, strip supported |
//! | Image | `.heic`, `.heif`, `.avif` | Accepted, but reported as a read error: no HEIF/AVIF pixel decoder is built in |
//! | Video | `.mp4`, `.m4v`, `.mov`, `.3gp` | Dimensions + duration |
//! | Video | `.mkv`, `.webm`, `.avi` | Accepted; properties when the container is readable |
//!
//! ## Modules
//!
//! - [`config`] Configuration types and loading/saving
//! - [`display`] Value formatting and category grouping
//! - [`exif`] Tag decoding, flattening, and GPS resolution
//! - [`export`] JSON export, metadata stripping, and save targets
//! - [`media`] File handles and media kind detection
//! - [`pipeline`] Per-file extraction, batch processing, and input collection
//! - [`preview`] Preview handle registry
//! - [`probe`] Image and video property probing

pub mod config;
pub mod display;
pub mod exif;
pub mod export;
pub mod media;
pub mod pipeline;
pub mod preview;
pub mod probe;
