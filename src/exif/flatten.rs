use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{RawTag, RawTags};

/// Display-ready metadata for one file, keyed by tag or field name.
///
/// Keys are unique and keep their first insertion position. Null and
/// empty-string values are never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatMetadata(Map<String, Value>);

impl FlatMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value. Returns `false` (and stores nothing) for null or empty strings.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> bool {
        if is_absent(&value) {
            return false;
        }
        self.0.insert(key.into(), value);
        true
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Pick the display value for one tag: description, then value, then the bare value.
fn resolve(tag: &RawTag) -> Option<Value> {
    match tag {
        RawTag::Record { description: Some(desc), .. } if !desc.is_empty() => {
            Some(Value::String(desc.clone()))
        }
        RawTag::Record { value: Some(value), .. } => Some(value.clone()),
        RawTag::Record { .. } => None,
        RawTag::Bare(value) => Some(value.clone()),
    }
}

/// Merge decoded tags on top of the intrinsic file and media fields.
///
/// Tags win on key collision.
pub fn flatten(intrinsic: FlatMetadata, tags: &RawTags) -> FlatMetadata {
    let mut flat = intrinsic;
    for (key, tag) in tags.iter() {
        match resolve(tag) {
            Some(value) => {
                flat.insert(key, value);
            }
            None => log::debug!("Tag {key} has no value, skipped"),
        }
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn intrinsic() -> FlatMetadata {
        let mut m = FlatMetadata::new();
        m.insert("name", json!("photo.jpg"));
        m.insert("size", json!(2048));
        m.insert("width", json!(640));
        m
    }

    #[test]
    fn insert_skips_null_and_empty() {
        let mut m = FlatMetadata::new();
        assert!(!m.insert("a", Value::Null));
        assert!(!m.insert("b", json!("")));
        assert!(m.insert("c", json!(0)));
        assert!(m.insert("d", json!(false)));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn description_beats_value() {
        let tags: RawTags = vec![("FNumber", RawTag::new(2.8, "f/2.8"))].into_iter().collect();
        let flat = flatten(FlatMetadata::new(), &tags);
        assert_eq!(flat.get("FNumber"), Some(&json!("f/2.8")));
    }

    #[test]
    fn value_used_without_description() {
        let tags: RawTags = vec![("ISOSpeedRatings", RawTag::value(400))].into_iter().collect();
        let flat = flatten(FlatMetadata::new(), &tags);
        assert_eq!(flat.get("ISOSpeedRatings"), Some(&json!(400)));
    }

    #[test]
    fn empty_description_falls_back_to_value() {
        let tag = RawTag::Record {
            value: Some(json!("raw")),
            description: Some(String::new()),
        };
        let tags: RawTags = vec![("Software", tag)].into_iter().collect();
        let flat = flatten(FlatMetadata::new(), &tags);
        assert_eq!(flat.get("Software"), Some(&json!("raw")));
    }

    #[test]
    fn bare_value_passes_through() {
        let tags: RawTags = vec![("Thumbnail", RawTag::Bare(json!({"type": "image/jpeg"})))]
            .into_iter()
            .collect();
        let flat = flatten(FlatMetadata::new(), &tags);
        assert_eq!(flat.get("Thumbnail"), Some(&json!({"type": "image/jpeg"})));
    }

    #[test]
    fn empty_record_is_skipped() {
        let tags: RawTags = vec![("Nothing", RawTag::Record { value: None, description: None })]
            .into_iter()
            .collect();
        let flat = flatten(FlatMetadata::new(), &tags);
        assert!(!flat.contains_key("Nothing"));
    }

    #[test]
    fn intrinsic_first_tags_win_on_collision() {
        let tags: RawTags = vec![
            ("Make", RawTag::described("Canon")),
            ("width", RawTag::value(4000)),
        ]
        .into_iter()
        .collect();
        let flat = flatten(intrinsic(), &tags);

        let keys: Vec<&str> = flat.keys().collect();
        assert_eq!(keys, vec!["name", "size", "width", "Make"]);
        assert_eq!(flat.get("width"), Some(&json!(4000)));
        assert_eq!(flat.get("name"), Some(&json!("photo.jpg")));
    }

    #[test]
    fn serializes_as_plain_object() {
        let flat = intrinsic();
        let text = serde_json::to_string(&flat).unwrap();
        assert_eq!(text, r#"{"name":"photo.jpg","size":2048,"width":640}"#);
    }
}
