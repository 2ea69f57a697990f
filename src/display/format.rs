use chrono::{DateTime, Local, TimeZone, Utc};
use serde_json::Value;

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Render a metadata value for display, based on the role of its key.
///
/// ```rust
/// use media_lens::display::format_value;
/// use serde_json::json;
///
/// assert_eq!(format_value("size", &json!(1536)), "1.5 KB");
/// assert_eq!(format_value("duration", &json!(125)), "2:05");
/// assert_eq!(format_value("width", &json!(1920)), "1920px");
/// assert_eq!(format_value("Make", &json!("Canon")), "Canon");
/// ```
pub fn format_value(key: &str, value: &Value) -> String {
    match key {
        "size" => match value.as_f64() {
            Some(bytes) => format_file_size(bytes),
            None => natural(value),
        },
        "lastModified" => format_date(value).unwrap_or_else(|| natural(value)),
        "duration" if value.is_number() => value.as_f64().map(format_duration).unwrap_or_default(),
        "width" | "height" => format!("{}px", natural(value)),
        _ if value.is_object() || value.is_array() => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        _ => natural(value),
    }
}

/// Turn a camelCase or PascalCase key into a spaced, capitalized label.
///
/// `"lastModified"` → `"Last Modified"`, `"GPSLatitude"` → `"G P S Latitude"`.
pub fn format_key(key: &str) -> String {
    let mut spaced = String::with_capacity(key.len() + 8);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            spaced.push(' ');
        }
        spaced.push(c);
    }
    let mut chars = spaced.chars();
    let label: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    label.trim().to_string()
}

/// Base-1024 byte size with up to two decimals.
pub fn format_file_size(bytes: f64) -> String {
    if bytes == 0.0 {
        return "0 Bytes".to_string();
    }
    let exponent = (bytes.abs().ln() / 1024f64.ln()).floor();
    let index = exponent.clamp(0.0, (SIZE_UNITS.len() - 1) as f64) as usize;
    let scaled = bytes / 1024f64.powi(index as i32);
    format!("{} {}", trim_decimals(&format!("{scaled:.2}")), SIZE_UNITS[index])
}

/// `M:SS`, minutes unpadded.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0);
    let minutes = (total / 60.0).floor() as u64;
    let secs = (total % 60.0).floor() as u64;
    format!("{minutes}:{secs:02}")
}

/// Format a timestamp as `M/D/YYYY, h:mm:ss AM`.
pub fn format_timestamp<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    dt.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

fn format_date(value: &Value) -> Option<String> {
    let utc = match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s).ok()?.with_timezone(&Utc),
        Value::Number(n) => DateTime::from_timestamp_millis(n.as_i64()?)?,
        _ => return None,
    };
    Some(format_timestamp(&utc.with_timezone(&Local)))
}

fn trim_decimals(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn natural(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── size ─────────────────────────────────────────────────────────

    #[test]
    fn size_units() {
        assert_eq!(format_value("size", &json!(0)), "0 Bytes");
        assert_eq!(format_value("size", &json!(512)), "512 Bytes");
        assert_eq!(format_value("size", &json!(1024)), "1 KB");
        assert_eq!(format_value("size", &json!(1536)), "1.5 KB");
        assert_eq!(format_value("size", &json!(1_572_864)), "1.5 MB");
        assert_eq!(format_value("size", &json!(1_234_567)), "1.18 MB");
        assert_eq!(format_value("size", &json!(3_221_225_472u64)), "3 GB");
    }

    #[test]
    fn size_beyond_gigabytes_stays_in_gb() {
        assert_eq!(format_file_size(2048.0 * 1024.0 * 1024.0 * 1024.0), "2048 GB");
    }

    #[test]
    fn non_numeric_size_falls_back() {
        assert_eq!(format_value("size", &json!("big")), "big");
    }

    // ── duration ─────────────────────────────────────────────────────

    #[test]
    fn duration_minutes_seconds() {
        assert_eq!(format_value("duration", &json!(125)), "2:05");
        assert_eq!(format_value("duration", &json!(59.9)), "0:59");
        assert_eq!(format_value("duration", &json!(3600)), "60:00");
    }

    #[test]
    fn non_numeric_duration_falls_back() {
        assert_eq!(format_value("duration", &json!("unknown")), "unknown");
    }

    // ── dimensions / structured / fallback ───────────────────────────

    #[test]
    fn dimensions_get_px() {
        assert_eq!(format_value("width", &json!(640)), "640px");
        assert_eq!(format_value("height", &json!(480)), "480px");
    }

    #[test]
    fn structured_values_pretty_printed() {
        let v = json!({"b": 1, "a": [1, 2]});
        assert_eq!(
            format_value("Thumbnail", &v),
            "{\n  \"b\": 1,\n  \"a\": [\n    1,\n    2\n  ]\n}"
        );
    }

    #[test]
    fn scalar_fallback() {
        assert_eq!(format_value("Make", &json!("Canon")), "Canon");
        assert_eq!(format_value("ISOSpeedRatings", &json!(400)), "400");
        assert_eq!(format_value("Flag", &json!(true)), "true");
    }

    // ── dates ────────────────────────────────────────────────────────

    #[test]
    fn timestamp_layout() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 9, 15, 4, 5).unwrap();
        assert_eq!(format_timestamp(&dt), "3/9/2024, 3:04:05 PM");
    }

    #[test]
    fn last_modified_parsed_from_iso() {
        let iso = "2024-03-09T15:04:05.000Z";
        let expected = format_timestamp(
            &DateTime::parse_from_rfc3339(iso).unwrap().with_timezone(&Local),
        );
        assert_eq!(format_value("lastModified", &json!(iso)), expected);
    }

    #[test]
    fn unparseable_last_modified_falls_back() {
        assert_eq!(format_value("lastModified", &json!("yesterday")), "yesterday");
    }

    // ── format_key ───────────────────────────────────────────────────

    #[test]
    fn key_labels() {
        assert_eq!(format_key("lastModified"), "Last Modified");
        assert_eq!(format_key("name"), "Name");
        assert_eq!(format_key("DateTimeOriginal"), "Date Time Original");
        assert_eq!(format_key("GPSLatitude"), "G P S Latitude");
        assert_eq!(format_key(""), "");
    }
}
