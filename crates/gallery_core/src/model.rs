//! Gallery data model: images, the ordered collection and page payloads

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

/// Stable image identifier
pub type ImageId = u64;

/// A single gallery image as delivered by the page API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: ImageId,
    pub source_url: String,
    #[serde(default)]
    pub caption: Option<String>,
    /// Canonical position in the gallery sequence
    pub order: i64,
}

impl Image {
    fn sort_key(&self) -> (i64, ImageId) {
        (self.order, self.id)
    }
}

/// Opaque UI element handle supplied by the host (focus targets, triggers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// Opaque pagination continuation token.
///
/// Servers send it either as a JSON string or a number (the last page's
/// maximum `order`); both forms are kept verbatim and echoed back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for Cursor {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl Serialize for Cursor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(i64),
            Float(f64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Cursor(s),
            Raw::Int(n) => Cursor(n.to_string()),
            Raw::Float(n) => Cursor(n.to_string()),
        })
    }
}

/// Request for one page of images
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub cursor: Option<Cursor>,
}

/// Pagination block of a page response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<Cursor>,
    #[serde(default)]
    pub total_count: u64,
}

/// One page of images
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResponse {
    pub images: Vec<Image>,
    pub pagination: PageInfo,
}

/// Result of merging one page into the collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: usize,
    pub duplicates: usize,
    /// Lowest index that received a new image, if any.
    /// Indices at or after it may have shifted.
    pub first_changed: Option<usize>,
}

/// Append-only ordered image sequence, deduplicated by id.
///
/// Ordered ascending by `(order, id)`. Only the pagination accumulator writes
/// to it; everything else reads.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    images: Vec<Image>,
    ids: HashSet<ImageId>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Image> {
        self.images.get(index)
    }

    pub fn as_slice(&self) -> &[Image] {
        &self.images
    }

    pub fn iter(&self) -> impl Iterator<Item = &Image> {
        self.images.iter()
    }

    pub fn contains(&self, id: ImageId) -> bool {
        self.ids.contains(&id)
    }

    /// Index of the image with `id`
    pub fn index_of(&self, id: ImageId) -> Option<usize> {
        if !self.ids.contains(&id) {
            return None;
        }
        self.images.iter().position(|img| img.id == id)
    }

    /// Insert images keeping `(order, id)` ascending; known ids are dropped
    pub(crate) fn merge(&mut self, page: Vec<Image>) -> MergeStats {
        let mut stats = MergeStats::default();

        for image in page {
            if !self.ids.insert(image.id) {
                stats.duplicates += 1;
                continue;
            }

            let key = image.sort_key();
            let pos = self.images.partition_point(|existing| existing.sort_key() < key);
            self.images.insert(pos, image);

            stats.inserted += 1;
            stats.first_changed = Some(stats.first_changed.map_or(pos, |p| p.min(pos)));
        }

        stats
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Image;
    type IntoIter = std::slice::Iter<'a, Image>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.iter()
    }
}

#[cfg(test)]
pub(crate) fn image(id: ImageId, order: i64) -> Image {
    Image {
        id,
        source_url: format!("https://cdn.example.com/{id}.jpg"),
        caption: None,
        order,
    }
}
