use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;

use media_lens::config::GpsConfig;
use media_lens::exif::{RawTag, RawTags, TagDecoder};
use media_lens::export::{ExportRecord, batch_export_name, export_batch, to_json};
use media_lens::media::MediaFile;
use media_lens::pipeline::{BatchPipeline, UNSUPPORTED_TYPE_ERROR};
use media_lens::probe::{MediaProber, MediaProperties};

/// Returns GPS tags only for files whose first byte is 1.
struct ScriptedDecoder;

#[async_trait]
impl TagDecoder for ScriptedDecoder {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn decode(&self, bytes: Arc<[u8]>) -> Result<RawTags> {
        let mut tags = RawTags::new();
        tags.insert("Model", RawTag::new("EOS R5", "EOS R5"));
        match bytes.first() {
            Some(1) => {
                tags.insert("GPSLatitude", RawTag::new(48.8584, "48.8584"));
                tags.insert("GPSLatitudeRef", RawTag::new("N", "N"));
                tags.insert("GPSLongitude", RawTag::new(2.2945, "2.2945"));
                tags.insert("GPSLongitudeRef", RawTag::new("E", "E"));
            }
            Some(9) => bail!("truncated IFD"),
            _ => {}
        }
        Ok(tags)
    }
}

struct FixedProber;

#[async_trait]
impl MediaProber for FixedProber {
    async fn probe_image(&self, _file: &MediaFile, _bytes: Arc<[u8]>) -> Result<MediaProperties> {
        Ok(MediaProperties {
            width: 4000,
            height: 3000,
            duration: None,
        })
    }

    async fn probe_video(&self, _file: &MediaFile) -> Result<MediaProperties> {
        Ok(MediaProperties {
            width: 1280,
            height: 720,
            duration: Some(42.0),
        })
    }
}

fn pipeline() -> BatchPipeline {
    BatchPipeline::new(
        Box::new(ScriptedDecoder),
        Box::new(FixedProber),
        GpsConfig::default(),
    )
}

fn file(name: &str, mime: &str, first_byte: u8) -> MediaFile {
    MediaFile::from_bytes(name, mime, vec![first_byte, 0, 0, 0], Utc::now())
}

#[tokio::test]
async fn unsupported_file_in_the_middle() {
    let mut p = pipeline();
    let files = vec![
        file("one.jpg", "image/jpeg", 1),
        file("two.pdf", "application/pdf", 0),
        file("three.mp4", "video/mp4", 0),
    ];
    let state = p.submit(files, |_| {}).await;

    assert_eq!(state.len(), 3);
    let names: Vec<&str> = state.iter().map(|r| r.file.name.as_str()).collect();
    assert_eq!(names, vec!["one.jpg", "two.pdf", "three.mp4"]);

    let first = state.get(0).unwrap();
    assert!(first.is_ok());
    assert!(first.metadata.as_ref().unwrap().contains_key("Model"));
    assert!(first.gps.is_some());

    let second = state.get(1).unwrap();
    assert_eq!(second.error.as_deref(), Some(UNSUPPORTED_TYPE_ERROR));
    assert!(second.metadata.is_none());
    assert!(second.gps.is_none());

    let third = state.get(2).unwrap();
    assert!(third.is_ok());
    let meta = third.metadata.as_ref().unwrap();
    assert!(meta.contains_key("duration"));
    assert!(!meta.contains_key("Model"));
}

#[tokio::test]
async fn image_without_gps_has_no_marker() {
    let mut p = pipeline();
    p.submit(vec![file("plain.jpg", "image/jpeg", 0)], |_| {}).await;

    let record = p.record(0).unwrap();
    assert!(record.is_ok());
    assert!(record.gps.is_none());
    assert!(record.map_marker().is_none());
}

#[tokio::test]
async fn marker_for_located_image() {
    let mut p = pipeline();
    p.submit(vec![file("tower.jpg", "image/jpeg", 1)], |_| {}).await;

    let marker = p.record(0).unwrap().map_marker().unwrap();
    assert_eq!(marker.latitude, 48.8584);
    assert_eq!(marker.longitude, 2.2945);
    assert_eq!(marker.title.as_deref(), Some("tower.jpg"));
}

#[tokio::test]
async fn broken_tags_still_yield_file_info() {
    let mut p = pipeline();
    p.submit(vec![file("broken.jpg", "image/jpeg", 9)], |_| {}).await;

    let record = p.record(0).unwrap();
    assert!(record.error.is_none());
    let names: Vec<&str> = record.categories().iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["File Information", "Image/Video Properties"]);
}

#[tokio::test]
async fn batch_export_round_trip() {
    let mut p = pipeline();
    let files = vec![
        file("one.jpg", "image/jpeg", 1),
        file("two.txt", "text/plain", 0),
    ];
    let state = p.submit(files, |_| {}).await;

    let text = to_json(&export_batch(state), true).unwrap();
    let parsed: Vec<ExportRecord> = serde_json::from_str(&text).unwrap();

    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[0].file_name, "one.jpg");
    let gps = parsed[0].gps_data.unwrap();
    assert_eq!((gps.latitude, gps.longitude), (48.8584, 2.2945));
    let keys: Vec<&str> = parsed[0].metadata.as_ref().unwrap().keys().collect();
    let original: Vec<&str> = state.get(0).unwrap().metadata.as_ref().unwrap().keys().collect();
    assert_eq!(keys, original);

    assert_eq!(parsed[1].error.as_deref(), Some(UNSUPPORTED_TYPE_ERROR));
    assert!(parsed[1].metadata.is_none());

    let date = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
    assert_eq!(batch_export_name(date), "metadata-export-2025-01-31.json");
}

#[tokio::test]
async fn preview_handles_follow_the_batch() {
    let mut p = pipeline();
    let registry = p.registry().clone();

    p.submit(
        vec![
            file("a.jpg", "image/jpeg", 0),
            file("b.jpg", "image/jpeg", 0),
            file("c.jpg", "image/jpeg", 0),
        ],
        |_| {},
    )
    .await;
    assert_eq!(registry.live_count(), 3);

    p.submit(vec![file("d.jpg", "image/jpeg", 0)], |_| {}).await;
    assert_eq!(registry.live_count(), 1);

    let uri = p.record(0).unwrap().preview().uri().to_string();
    assert!(uri.ends_with("/d.jpg"));

    p.clear();
    assert_eq!(registry.live_count(), 0);
    assert!(p.state().is_empty());
}
