use crate::exif::FlatMetadata;

use super::format::{format_key, format_value};

const PREVIEW_MAX_CHARS: usize = 50;

const EXIF_HINTS: &[&str] = &[
    "exif", "gps", "camera", "make", "model", "iso", "aperture", "shutter", "focal",
];
const TECHNICAL_HINTS: &[&str] = &["format", "codec", "bitrate", "fps", "compression"];

/// The fixed set of display categories, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryKind {
    FileInformation,
    MediaProperties,
    Exif,
    Technical,
    Other,
}

impl CategoryKind {
    pub const ALL: [Self; 5] = [
        Self::FileInformation,
        Self::MediaProperties,
        Self::Exif,
        Self::Technical,
        Self::Other,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::FileInformation => "File Information",
            Self::MediaProperties => "Image/Video Properties",
            Self::Exif => "EXIF Data",
            Self::Technical => "Technical Details",
            Self::Other => "Other",
        }
    }

    /// Bucket for a metadata key; first matching rule wins.
    pub fn of(key: &str) -> Self {
        if matches!(key, "name" | "size" | "type" | "lastModified") {
            return Self::FileInformation;
        }
        if matches!(key, "width" | "height" | "duration") {
            return Self::MediaProperties;
        }
        let lower = key.to_lowercase();
        if EXIF_HINTS.iter().any(|h| lower.contains(h)) {
            Self::Exif
        } else if TECHNICAL_HINTS.iter().any(|h| lower.contains(h)) {
            Self::Technical
        } else {
            Self::Other
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// A named slice of one file's metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub kind: CategoryKind,
    pub name: &'static str,
    pub items: FlatMetadata,
    pub count: usize,
    /// Formatted first value, cut to 50 characters.
    pub preview: String,
}

impl Category {
    /// `(label, formatted value)` pairs for every item, in map order.
    pub fn rows(&self) -> Vec<(String, String)> {
        self.items
            .iter()
            .map(|(k, v)| (format_key(k), format_value(k, v)))
            .collect()
    }
}

fn truncate_preview(text: String) -> String {
    if text.chars().count() > PREVIEW_MAX_CHARS {
        let mut cut: String = text.chars().take(PREVIEW_MAX_CHARS).collect();
        cut.push_str("...");
        cut
    } else {
        text
    }
}

/// Partition metadata into categories, skipping empty ones.
pub fn categorize(metadata: &FlatMetadata) -> Vec<Category> {
    let mut buckets: [FlatMetadata; 5] = Default::default();
    for (key, value) in metadata.iter() {
        buckets[CategoryKind::of(key).index()].insert(key, value.clone());
    }

    CategoryKind::ALL
        .into_iter()
        .zip(buckets)
        .filter(|(_, items)| !items.is_empty())
        .map(|(kind, items)| {
            let preview = items
                .iter()
                .next()
                .map(|(k, v)| truncate_preview(format_value(k, v)))
                .unwrap_or_default();
            Category {
                kind,
                name: kind.name(),
                count: items.len(),
                items,
                preview,
            }
        })
        .collect()
}

/// Find one category by name, ignoring case.
pub fn find_category(metadata: &FlatMetadata, name: &str) -> Option<Category> {
    categorize(metadata)
        .into_iter()
        .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn sample() -> FlatMetadata {
        let mut m = FlatMetadata::new();
        for (k, v) in [
            ("name", json!("photo.jpg")),
            ("size", json!(1536)),
            ("type", json!("image/jpeg")),
            ("lastModified", json!("2024-01-01T00:00:00.000Z")),
            ("width", json!(640)),
            ("height", json!(480)),
            ("Make", json!("Canon")),
            ("GPSLatitude", json!("34.05")),
            ("Compression", json!("JPEG")),
            ("Software", json!("GIMP")),
            ("ExposureTime", json!("1/125")),
        ] {
            m.insert(k, v);
        }
        m
    }

    #[test]
    fn buckets_by_rule_order() {
        assert_eq!(CategoryKind::of("name"), CategoryKind::FileInformation);
        assert_eq!(CategoryKind::of("duration"), CategoryKind::MediaProperties);
        assert_eq!(CategoryKind::of("LensModel"), CategoryKind::Exif);
        assert_eq!(CategoryKind::of("ISOSpeedRatings"), CategoryKind::Exif);
        assert_eq!(CategoryKind::of("ExifVersion"), CategoryKind::Exif);
        assert_eq!(CategoryKind::of("VideoCodec"), CategoryKind::Technical);
        // exif hints are checked before technical ones
        assert_eq!(CategoryKind::of("GPSFormat"), CategoryKind::Exif);
        assert_eq!(CategoryKind::of("Software"), CategoryKind::Other);
        // exact-match keys are case-sensitive
        assert_eq!(CategoryKind::of("Width"), CategoryKind::Other);
    }

    #[test]
    fn emits_fixed_order_and_counts() {
        let cats = categorize(&sample());
        let names: Vec<&str> = cats.iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec![
                "File Information",
                "Image/Video Properties",
                "EXIF Data",
                "Technical Details",
                "Other"
            ]
        );
        let counts: Vec<usize> = cats.iter().map(|c| c.count).collect();
        assert_eq!(counts, vec![4, 2, 2, 1, 2]);
    }

    #[test]
    fn order_independent_of_insertion() {
        let mut m = FlatMetadata::new();
        m.insert("Software", json!("GIMP"));
        m.insert("Make", json!("Canon"));
        m.insert("name", json!("a.jpg"));
        let names: Vec<&str> = categorize(&m).iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["File Information", "EXIF Data", "Other"]);
    }

    #[test]
    fn skips_empty_categories() {
        let mut m = FlatMetadata::new();
        m.insert("width", json!(10));
        let cats = categorize(&m);
        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0].kind, CategoryKind::MediaProperties);
        assert!(categorize(&FlatMetadata::new()).is_empty());
    }

    #[test]
    fn every_key_in_exactly_one_category() {
        let meta = sample();
        let cats = categorize(&meta);
        for key in meta.keys() {
            let hits = cats.iter().filter(|c| c.items.contains_key(key)).count();
            assert_eq!(hits, 1, "key {key} appeared {hits} times");
        }
        let total: usize = cats.iter().map(|c| c.count).sum();
        assert_eq!(total, meta.len());
    }

    #[test]
    fn preview_is_first_formatted_value() {
        let cats = categorize(&sample());
        assert_eq!(cats[0].preview, "photo.jpg");
        assert_eq!(cats[1].preview, "640px");
    }

    #[test]
    fn long_preview_truncated() {
        let mut m = FlatMetadata::new();
        m.insert("Comment", Value::String("x".repeat(80)));
        let cats = categorize(&m);
        assert_eq!(cats[0].preview, format!("{}...", "x".repeat(50)));

        let mut m = FlatMetadata::new();
        m.insert("Comment", Value::String("y".repeat(50)));
        assert_eq!(categorize(&m)[0].preview, "y".repeat(50));
    }

    #[test]
    fn rows_use_labels_and_formatting() {
        let cat = find_category(&sample(), "file information").unwrap();
        let rows = cat.rows();
        assert_eq!(rows[0], ("Name".to_string(), "photo.jpg".to_string()));
        assert_eq!(rows[1], ("Size".to_string(), "1.5 KB".to_string()));
        assert!(find_category(&sample(), "Nope").is_none());
    }
}
