//! Tag decoding, flattening, and GPS resolution.
//!
//! - [`TagDecoder`] turns raw file bytes into [`RawTags`] ([`NomExifDecoder`] by default)
//! - [`flatten`] collapses raw tags plus intrinsic fields into [`FlatMetadata`]
//! - [`resolve_gps`] extracts a [`GeoCoordinate`] from raw GPS tags

mod flatten;
mod gps;
mod reader;

pub use flatten::{FlatMetadata, flatten};
pub use gps::{GeoCoordinate, parse_float_prefix, resolve_gps};
pub use reader::NomExifDecoder;

use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;

/// One decoded tag.
///
/// Decoders usually wrap a tag in a [`RawTag::Record`] carrying a machine
/// value and/or a human-readable description. Values returned without a
/// wrapper are kept as [`RawTag::Bare`].
#[derive(Debug, Clone, PartialEq)]
pub enum RawTag {
    Record {
        value: Option<Value>,
        description: Option<String>,
    },
    Bare(Value),
}

impl RawTag {
    /// A record with both a value and a description.
    pub fn new(value: impl Into<Value>, description: impl Into<String>) -> Self {
        Self::Record {
            value: Some(value.into()),
            description: Some(description.into()),
        }
    }

    /// A record with only a machine value.
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Record {
            value: Some(value.into()),
            description: None,
        }
    }

    /// A record with only a description.
    pub fn described(description: impl Into<String>) -> Self {
        Self::Record {
            value: None,
            description: Some(description.into()),
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Record { description, .. } => description.as_deref(),
            Self::Bare(_) => None,
        }
    }

    pub fn raw_value(&self) -> Option<&Value> {
        match self {
            Self::Record { value, .. } => value.as_ref(),
            Self::Bare(value) => Some(value),
        }
    }
}

/// Decoded tags keyed by name, in decoder order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTags {
    entries: Vec<(String, RawTag)>,
}

impl RawTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tag, replacing any existing tag with the same key in place.
    pub fn insert(&mut self, key: impl Into<String>, tag: RawTag) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = tag,
            None => self.entries.push((key, tag)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&RawTag> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, t)| t)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawTag)> {
        self.entries.iter().map(|(k, t)| (k.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, RawTag)> for RawTags {
    fn from_iter<I: IntoIterator<Item = (K, RawTag)>>(iter: I) -> Self {
        let mut tags = Self::new();
        for (key, tag) in iter {
            tags.insert(key, tag);
        }
        tags
    }
}

/// Decodes embedded metadata tags from raw file bytes.
///
/// Implement this trait to plug in another tag source. Errors are treated
/// as non-fatal by the pipeline: the file still gets a record, just
/// without tag data.
#[async_trait::async_trait]
pub trait TagDecoder: Send + Sync {
    /// Display name used in logs.
    fn name(&self) -> &str;
    /// Decode all tags found in `bytes`.
    async fn decode(&self, bytes: Arc<[u8]>) -> Result<RawTags>;
}
