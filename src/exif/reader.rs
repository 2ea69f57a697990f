use anyhow::{Context, Result};
use nom_exif::*;
use serde_json::Value;
use std::io::Cursor;
use std::sync::Arc;

use super::{RawTag, RawTags, TagDecoder};

// GPS and interoperability sub-IFD tag codes all sit below this value and
// collide with each other, so GPS comes from `parse_gps_info` instead.
const SUB_IFD_TAG_CEILING: u16 = 0x0020;

// IFD pointers and opaque vendor blobs.
const SKIPPED_TAGS: &[u16] = &[0x8769, 0x8825, 0xA005, 0x927C, 0xC4A5];

const TAG_EXPOSURE_TIME: u16 = 0x829A;
const TAG_F_NUMBER: u16 = 0x829D;
const TAG_FOCAL_LENGTH: u16 = 0x920A;

/// Display names for common EXIF tag codes.
fn tag_name(code: u16) -> Option<&'static str> {
    Some(match code {
        0x0100 => "ImageWidth",
        0x0101 => "ImageLength",
        0x0102 => "BitsPerSample",
        0x0103 => "Compression",
        0x0106 => "PhotometricInterpretation",
        0x010E => "ImageDescription",
        0x010F => "Make",
        0x0110 => "Model",
        0x0112 => "Orientation",
        0x011A => "XResolution",
        0x011B => "YResolution",
        0x0128 => "ResolutionUnit",
        0x0131 => "Software",
        0x0132 => "DateTime",
        0x013B => "Artist",
        0x0201 => "JPEGInterchangeFormat",
        0x0202 => "JPEGInterchangeFormatLength",
        0x0213 => "YCbCrPositioning",
        0x8298 => "Copyright",
        0x829A => "ExposureTime",
        0x829D => "FNumber",
        0x8822 => "ExposureProgram",
        0x8827 => "ISOSpeedRatings",
        0x8830 => "SensitivityType",
        0x9000 => "ExifVersion",
        0x9003 => "DateTimeOriginal",
        0x9004 => "DateTimeDigitized",
        0x9010 => "OffsetTime",
        0x9011 => "OffsetTimeOriginal",
        0x9101 => "ComponentsConfiguration",
        0x9201 => "ShutterSpeedValue",
        0x9202 => "ApertureValue",
        0x9203 => "BrightnessValue",
        0x9204 => "ExposureBiasValue",
        0x9205 => "MaxApertureValue",
        0x9207 => "MeteringMode",
        0x9209 => "Flash",
        0x920A => "FocalLength",
        0x9286 => "UserComment",
        0x9290 => "SubSecTime",
        0x9291 => "SubSecTimeOriginal",
        0x9C9B => "XPTitle",
        0x9C9C => "XPComment",
        0x9C9D => "XPAuthor",
        0x9C9E => "XPKeywords",
        0x9C9F => "XPSubject",
        0xA000 => "FlashpixVersion",
        0xA001 => "ColorSpace",
        0xA002 => "PixelXDimension",
        0xA003 => "PixelYDimension",
        0xA402 => "ExposureMode",
        0xA403 => "WhiteBalance",
        0xA405 => "FocalLengthIn35mmFilm",
        0xA406 => "SceneCaptureType",
        0xA420 => "ImageUniqueID",
        0xA432 => "LensSpecification",
        0xA433 => "LensMake",
        0xA434 => "LensModel",
        _ => return None,
    })
}

/// Tag decoder backed by `nom-exif`.
///
/// Handles JPEG, TIFF, HEIF/HEIC, PNG, WebP and the RAW formats `nom-exif`
/// understands. Files without any EXIF block decode to an empty tag set.
#[derive(Debug, Default)]
pub struct NomExifDecoder;

impl NomExifDecoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl TagDecoder for NomExifDecoder {
    fn name(&self) -> &str {
        "nom-exif"
    }

    async fn decode(&self, bytes: Arc<[u8]>) -> Result<RawTags> {
        tokio::task::spawn_blocking(move || decode_blocking(&bytes))
            .await
            .context("EXIF decode task failed")?
    }
}

fn decode_blocking(bytes: &[u8]) -> Result<RawTags> {
    let mut parser = MediaParser::new();
    let ms = MediaSource::seekable(Cursor::new(bytes)).context("Unrecognized media container")?;

    if !ms.has_exif() {
        log::debug!("No EXIF block present");
        return Ok(RawTags::new());
    }

    let iter: ExifIter = parser.parse(ms).context("Failed to parse EXIF data")?;

    // Parse GPS info before iterating (iteration consumes the iterator)
    let gps_info = iter.parse_gps_info().ok().flatten();

    let mut tags = RawTags::new();
    for mut entry in iter {
        let code = entry.tag_code();
        if code < SUB_IFD_TAG_CEILING || SKIPPED_TAGS.contains(&code) {
            continue;
        }
        let value = match entry.take_value() {
            Some(v) => v,
            None => continue,
        };
        let key = tag_name(code)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Tag0x{code:04X}"));
        // The thumbnail IFD repeats some primary-image tags; keep the first.
        if tags.contains_key(&key) {
            continue;
        }
        if let Some(tag) = entry_to_tag(code, &value) {
            tags.insert(key, tag);
        }
    }

    if let Some(gps) = gps_info {
        insert_gps_tags(&mut tags, &gps);
    }

    log::debug!("Decoded {} EXIF tags", tags.len());
    Ok(tags)
}

/// Convert an EntryValue to its trimmed display text.
fn entry_text(val: &EntryValue) -> Option<String> {
    let s = val.to_string();
    let s = s.trim().trim_matches('"').trim().to_string();
    if s.is_empty() { None } else { Some(s) }
}

/// Read `"n/d"` or `"n/d (approx)"` as a float.
fn parse_rational(text: &str) -> Option<f64> {
    let (num, rest) = text.split_once('/')?;
    let den = rest.split_whitespace().next()?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.parse().ok()?;
    if den == 0.0 { None } else { Some(num / den) }
}

fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

fn entry_to_tag(code: u16, val: &EntryValue) -> Option<RawTag> {
    let text = entry_text(val)?;
    let number = text
        .parse::<f64>()
        .ok()
        .or_else(|| parse_rational(&text))
        .filter(|n| n.is_finite());

    let Some(n) = number else {
        return Some(RawTag::new(text.clone(), text));
    };

    let tag = match code {
        TAG_EXPOSURE_TIME if n > 0.0 && n < 1.0 => {
            RawTag::new(number_value(n), format!("1/{}", (1.0 / n).round()))
        }
        TAG_F_NUMBER => RawTag::new(number_value(n), format!("f/{n:.1}")),
        TAG_FOCAL_LENGTH => RawTag::new(number_value(n), format!("{n} mm")),
        _ => RawTag::value(number_value(n)),
    };
    Some(tag)
}

/// Convert a nom-exif LatLng (3 URationals: deg, min, sec) to unsigned decimal degrees.
fn latlng_to_decimal(latlng: &LatLng) -> Option<f64> {
    let parts = [&latlng.0, &latlng.1, &latlng.2];
    if parts.iter().any(|r| r.1 == 0) {
        return None;
    }
    let degrees = latlng.0.0 as f64 / latlng.0.1 as f64;
    let minutes = latlng.1.0 as f64 / latlng.1.1 as f64;
    let seconds = latlng.2.0 as f64 / latlng.2.1 as f64;
    Some(degrees + minutes / 60.0 + seconds / 3600.0)
}

/// Expose parsed GPS info as raw `GPS*` tags with numeric descriptions.
fn insert_gps_tags(tags: &mut RawTags, gps: &GPSInfo) {
    let (Some(lat), Some(lon)) = (
        latlng_to_decimal(&gps.latitude),
        latlng_to_decimal(&gps.longitude),
    ) else {
        log::debug!("GPS block has a zero denominator, ignored");
        return;
    };

    let lat_ref = gps.latitude_ref.to_string();
    let lon_ref = gps.longitude_ref.to_string();
    tags.insert("GPSLatitudeRef", RawTag::new(lat_ref.clone(), lat_ref));
    tags.insert("GPSLatitude", RawTag::new(lat, lat.to_string()));
    tags.insert("GPSLongitudeRef", RawTag::new(lon_ref.clone(), lon_ref));
    tags.insert("GPSLongitude", RawTag::new(lon, lon.to_string()));

    if gps.altitude.1 != 0 {
        let altitude = gps.altitude.0 as f64 / gps.altitude.1 as f64;
        let below = gps.altitude_ref == 1;
        tags.insert(
            "GPSAltitudeRef",
            RawTag::new(
                gps.altitude_ref,
                if below { "Below sea level" } else { "Sea level" },
            ),
        );
        tags.insert("GPSAltitude", RawTag::new(altitude, format!("{altitude} m")));
    }
}
