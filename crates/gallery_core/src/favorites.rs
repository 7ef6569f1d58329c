//! Favorite images
//!
//! The favorite set lives as a JSON id array under one key of a
//! [`KeyValueStore`], and is mirrored into a comma-separated query parameter
//! so a shared link carries it along.

use crate::model::{Image, ImageId};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt store data: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl From<StoreError> for crate::error::GalleryError {
    fn from(e: StoreError) -> Self {
        crate::error::GalleryError::Storage(e.to_string())
    }
}

/// String key-value persistence (`get`/`set`)
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a single JSON object on disk
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), keys = values.len(), "Key-value store opened");
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(values)?;
        // Write-then-rename so a crash never leaves a truncated file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock();
        let previous = values.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush(&values) {
            match previous {
                Some(previous) => values.insert(key.to_string(), previous),
                None => values.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }
}

/// Parse a `favorites` query value (`"3,17,42"`); junk entries are skipped
pub fn parse_query_value(value: &str) -> BTreeSet<ImageId> {
    value
        .split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

/// Format ids as a `favorites` query value
pub fn format_query_value(ids: &BTreeSet<ImageId>) -> String {
    ids.iter().map(ImageId::to_string).collect::<Vec<_>>().join(",")
}

/// Value of `param` in a path's query string
pub fn query_param<'a>(path: &'a str, param: &str) -> Option<&'a str> {
    let query = path.split_once('?')?.1;
    let query = query.split('#').next().unwrap_or(query);
    query
        .split('&')
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .find(|(key, _)| *key == param)
        .map(|(_, value)| value)
}

/// Replace (or add, or drop when `value` is `None`) `param` in a path's query
pub fn with_query_param(path: &str, param: &str, value: Option<&str>) -> String {
    let (base, fragment) = match path.split_once('#') {
        Some((b, f)) => (b, Some(f)),
        None => (path, None),
    };
    let (route, query) = base.split_once('?').unwrap_or((base, ""));

    let mut pairs: Vec<String> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| pair.split('=').next() != Some(param))
        .map(str::to_string)
        .collect();
    if let Some(value) = value {
        pairs.push(format!("{}={}", param, value));
    }

    let mut out = route.to_string();
    if !pairs.is_empty() {
        out.push('?');
        out.push_str(&pairs.join("&"));
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

pub struct Favorites {
    store: Box<dyn KeyValueStore>,
    key: String,
    ids: BTreeSet<ImageId>,
}

impl Favorites {
    /// Load the favorite set from `store`; corrupt data starts empty
    pub fn load(store: impl KeyValueStore + 'static, key: &str) -> Result<Self, StoreError> {
        let ids = match store.get(key)? {
            Some(raw) => serde_json::from_str::<Vec<ImageId>>(&raw)
                .map(|ids| ids.into_iter().collect())
                .unwrap_or_else(|e| {
                    tracing::warn!(key, error = %e, "Discarding unreadable favorites");
                    BTreeSet::new()
                }),
            None => BTreeSet::new(),
        };
        Ok(Self {
            store: Box::new(store),
            key: key.to_string(),
            ids,
        })
    }

    pub fn is_favorite(&self, id: ImageId) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> &BTreeSet<ImageId> {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Flip an image's favorite flag; returns the new flag
    pub fn toggle(&mut self, image: &Image) -> Result<bool, StoreError> {
        let now_favorite = if self.ids.remove(&image.id) {
            false
        } else {
            self.ids.insert(image.id);
            true
        };

        if let Err(e) = self.persist() {
            // Keep memory and storage in agreement
            if now_favorite {
                self.ids.remove(&image.id);
            } else {
                self.ids.insert(image.id);
            }
            return Err(e);
        }

        tracing::debug!(id = image.id, favorite = now_favorite, "Favorite toggled");
        Ok(now_favorite)
    }

    /// Add ids carried by a shared link; returns how many were new
    pub fn merge_from_query(&mut self, value: &str) -> Result<usize, StoreError> {
        let new_ids: Vec<ImageId> = parse_query_value(value)
            .into_iter()
            .filter(|id| !self.ids.contains(id))
            .collect();
        if new_ids.is_empty() {
            return Ok(0);
        }

        self.ids.extend(new_ids.iter().copied());
        if let Err(e) = self.persist() {
            for id in &new_ids {
                self.ids.remove(id);
            }
            return Err(e);
        }
        tracing::info!(added = new_ids.len(), "Favorites merged from link");
        Ok(new_ids.len())
    }

    /// Query value to mirror into the address bar; `None` when empty
    pub fn query_value(&self) -> Option<String> {
        (!self.ids.is_empty()).then(|| format_query_value(&self.ids))
    }

    fn persist(&self) -> Result<(), StoreError> {
        let ids: Vec<ImageId> = self.ids.iter().copied().collect();
        self.store.set(&self.key, &serde_json::to_string(&ids)?)
    }
}
