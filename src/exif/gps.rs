use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{RawTag, RawTags};
use crate::config::GpsConfig;

/// A resolved geographic position in signed decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
}

/// Parse the leading decimal number of `s`, ignoring trailing text.
///
/// `"34.05"` → `34.05`, `"120 m"` → `120.0`, `"  -1.5e2deg"` → `-150.0`,
/// `"N/A"` → `None`.
pub fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    // Optional exponent, only taken when complete.
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerce a raw machine value to a number.
fn coerce_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

/// How a component was read: from its description or from the raw value.
enum Source {
    Description,
    RawValue,
}

fn component(tag: &RawTag) -> Option<(f64, Source)> {
    match tag.description() {
        Some(desc) => parse_float_prefix(desc).map(|v| (v, Source::Description)),
        None => tag.raw_value().and_then(coerce_value).map(|v| (v, Source::RawValue)),
    }
}

fn reference_is(tags: &RawTags, key: &str, expected: &str) -> bool {
    tags.get(key)
        .and_then(RawTag::description)
        .is_some_and(|d| d.trim() == expected)
}

fn resolve_altitude(tags: &RawTags) -> Option<f64> {
    let (altitude, _) = component(tags.get("GPSAltitude")?)?;
    let below_sea_level = tags
        .get("GPSAltitudeRef")
        .and_then(RawTag::description)
        .is_some_and(|d| matches!(d.trim(), "1" | "Below sea level"));
    Some(if below_sea_level { -altitude } else { altitude })
}

/// Resolve a coordinate from raw GPS tags.
///
/// Returns `None` when `GPSLatitude` or `GPSLongitude` is missing, either
/// is non-numeric, or the corrected position is out of range. A
/// non-numeric `GPSAltitude` is dropped without invalidating the position.
pub fn resolve_gps(tags: &RawTags, options: &GpsConfig) -> Option<GeoCoordinate> {
    let (mut latitude, _) = component(tags.get("GPSLatitude")?)?;
    let (mut longitude, lon_source) = component(tags.get("GPSLongitude")?)?;

    // Suspect legacy behaviour, off unless explicitly configured.
    if options.negate_raw_longitude && matches!(lon_source, Source::RawValue) {
        longitude = -longitude;
    }

    if reference_is(tags, "GPSLatitudeRef", "S") {
        latitude = -latitude;
    }
    if reference_is(tags, "GPSLongitudeRef", "W") {
        longitude = -longitude;
    }

    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        log::debug!("GPS position out of range: {latitude}, {longitude}");
        return None;
    }

    Some(GeoCoordinate {
        latitude,
        longitude,
        altitude: resolve_altitude(tags),
    })
}
