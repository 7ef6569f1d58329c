//! Deep links between the address bar and the lightbox
//!
//! URL shape: `{base}` for the grid and `{base}/{imageId}` for an open image.
//! Query strings ride along untouched.

use crate::lightbox::LightboxState;
use crate::model::{Collection, ImageId};

/// Address bar access supplied by the host
pub trait Location {
    /// Current path including any query string
    fn current(&self) -> String;
    /// Replace the current history entry without pushing a new one
    fn replace(&mut self, path: &str);
}

/// What a path points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget {
    Gallery,
    Image(ImageId),
    /// Under the base path but not a valid image id
    Invalid,
    /// Not a gallery path at all
    Elsewhere,
}

/// What the session should do about a pending deep link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing pending
    Idle,
    Open { index: usize, id: ImageId },
    /// Not loaded yet but more pages exist; resolve again after the next page
    LoadMore(ImageId),
    /// Link names no image in the complete collection
    NotFound(Option<ImageId>),
    /// Navigated back to the grid while the lightbox is open
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Image(ImageId),
    Invalid,
    Gallery,
}

fn split_query(path: &str) -> (&str, &str) {
    match path.find(['?', '#']) {
        Some(i) => path.split_at(i),
        None => (path, ""),
    }
}

pub struct DeepLinkSync {
    base: String,
    pending: Option<Pending>,
}

impl DeepLinkSync {
    pub fn new(base_path: &str) -> Self {
        let trimmed = base_path.trim_end_matches('/');
        let base = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        };
        Self {
            base,
            pending: None,
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base
    }

    /// Classify a path (query string ignored)
    pub fn parse(&self, path: &str) -> LinkTarget {
        let (path, _) = split_query(path);
        let Some(rest) = path.strip_prefix(self.base.as_str()) else {
            return LinkTarget::Elsewhere;
        };

        let rest = rest.trim_end_matches('/');
        if rest.is_empty() {
            return LinkTarget::Gallery;
        }
        let Some(segment) = rest.strip_prefix('/') else {
            // e.g. "/gallery-old"
            return LinkTarget::Elsewhere;
        };

        if segment.is_empty() || segment.contains('/') || !segment.bytes().all(|b| b.is_ascii_digit()) {
            return LinkTarget::Invalid;
        }
        segment.parse().map(LinkTarget::Image).unwrap_or(LinkTarget::Invalid)
    }

    /// Path for the grid or one image
    pub fn format(&self, id: Option<ImageId>) -> String {
        match id {
            Some(id) => format!("{}/{}", self.base, id),
            None => self.base.clone(),
        }
    }

    /// Mirror lightbox state into the address bar.
    ///
    /// Returns the new path if the location was replaced.
    pub fn sync_location(
        &self,
        state: &LightboxState,
        collection: &Collection,
        location: &mut dyn Location,
    ) -> Option<String> {
        let current = location.current();
        let (path, query) = split_query(&current);
        if matches!(self.parse(path), LinkTarget::Elsewhere) {
            return None;
        }

        let desired_id = if state.is_open {
            collection.get(state.current_index).map(|img| img.id)
        } else {
            None
        };
        let desired = self.format(desired_id);

        let shown_id = match self.parse(path) {
            LinkTarget::Image(id) => Some(id),
            _ => None,
        };
        if shown_id == desired_id && (desired_id.is_some() || path == desired) {
            return None;
        }

        let next = format!("{}{}", desired, query);
        tracing::debug!(from = %current, to = %next, "Replacing location");
        location.replace(&next);
        Some(next)
    }

    /// Record an initial load or external navigation (back/forward)
    pub fn on_navigate(&mut self, path: &str) {
        self.pending = match self.parse(path) {
            LinkTarget::Image(id) => Some(Pending::Image(id)),
            LinkTarget::Invalid => Some(Pending::Invalid),
            LinkTarget::Gallery => Some(Pending::Gallery),
            LinkTarget::Elsewhere => None,
        };
        tracing::debug!(path, pending = ?self.pending, "Navigation recorded");
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Resolve the pending link against what is loaded so far.
    ///
    /// `LoadMore` keeps the link pending; every other outcome consumes it.
    pub fn resolve(&mut self, collection: &Collection, has_more: bool, is_open: bool) -> Resolution {
        let Some(pending) = self.pending else {
            return Resolution::Idle;
        };

        let resolution = match pending {
            Pending::Gallery if is_open => Resolution::Close,
            Pending::Gallery => Resolution::Idle,
            Pending::Invalid => Resolution::NotFound(None),
            Pending::Image(id) => match collection.index_of(id) {
                Some(index) => Resolution::Open { index, id },
                None if has_more => Resolution::LoadMore(id),
                None => Resolution::NotFound(Some(id)),
            },
        };

        if !matches!(resolution, Resolution::LoadMore(_)) {
            self.pending = None;
        }
        tracing::debug!(?resolution, "Deep link resolved");
        resolution
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::image;

    #[derive(Debug, Default)]
    pub(crate) struct MemoryLocation {
        pub path: String,
        pub replaced: Vec<String>,
    }

    impl MemoryLocation {
        pub fn at(path: &str) -> Self {
            Self {
                path: path.to_string(),
                replaced: Vec::new(),
            }
        }
    }

    impl Location for MemoryLocation {
        fn current(&self) -> String {
            self.path.clone()
        }

        fn replace(&mut self, path: &str) {
            self.path = path.to_string();
            self.replaced.push(path.to_string());
        }
    }

    fn collection(ids: &[ImageId]) -> Collection {
        let mut c = Collection::new();
        c.merge(ids.iter().map(|&id| image(id, id as i64)).collect());
        c
    }

    #[test]
    fn test_parse_paths() {
        let link = DeepLinkSync::new("/gallery/");
        assert_eq!(link.parse("/gallery"), LinkTarget::Gallery);
        assert_eq!(link.parse("/gallery/"), LinkTarget::Gallery);
        assert_eq!(link.parse("/gallery/42"), LinkTarget::Image(42));
        assert_eq!(link.parse("/gallery/42?favorites=1,2"), LinkTarget::Image(42));
        assert_eq!(link.parse("/gallery/abc"), LinkTarget::Invalid);
        assert_eq!(link.parse("/gallery/-3"), LinkTarget::Invalid);
        assert_eq!(link.parse("/gallery/1/2"), LinkTarget::Invalid);
        assert_eq!(link.parse("/gallery/99999999999999999999999"), LinkTarget::Invalid);
        assert_eq!(link.parse("/galleryx"), LinkTarget::Elsewhere);
        assert_eq!(link.parse("/booking"), LinkTarget::Elsewhere);
        assert_eq!(link.format(Some(7)), "/gallery/7");
    }

    #[test]
    fn test_sync_replaces_only_when_different() {
        let link = DeepLinkSync::new("/gallery");
        let c = collection(&[10, 20, 30]);
        let mut loc = MemoryLocation::at("/gallery?favorites=10");

        let open = LightboxState { is_open: true, current_index: 1, trigger: None };
        assert_eq!(
            link.sync_location(&open, &c, &mut loc),
            Some("/gallery/20?favorites=10".to_string())
        );
        assert_eq!(link.sync_location(&open, &c, &mut loc), None);

        let closed = LightboxState { is_open: false, ..open };
        link.sync_location(&closed, &c, &mut loc);
        assert_eq!(loc.path, "/gallery?favorites=10");
        assert_eq!(loc.replaced.len(), 2);
    }

    #[test]
    fn test_sync_ignores_foreign_paths() {
        let link = DeepLinkSync::new("/gallery");
        let c = collection(&[10]);
        let mut loc = MemoryLocation::at("/contact");
        let open = LightboxState { is_open: true, current_index: 0, trigger: None };
        assert_eq!(link.sync_location(&open, &c, &mut loc), None);
    }

    #[test]
    fn test_resolve_waits_for_more_pages() {
        let mut link = DeepLinkSync::new("/gallery");
        link.on_navigate("/gallery/30");

        let partial = collection(&[10, 20]);
        assert_eq!(link.resolve(&partial, true, false), Resolution::LoadMore(30));
        assert!(link.has_pending());

        let full = collection(&[10, 20, 30]);
        assert_eq!(link.resolve(&full, false, false), Resolution::Open { index: 2, id: 30 });
        assert!(!link.has_pending());
    }

    #[test]
    fn test_unknown_id_after_exhaustion_is_not_found() {
        let mut link = DeepLinkSync::new("/gallery");
        link.on_navigate("/gallery/999");
        let c = collection(&[1, 2, 3]);
        assert_eq!(link.resolve(&c, false, false), Resolution::NotFound(Some(999)));
        assert_eq!(link.resolve(&c, false, false), Resolution::Idle);
    }

    #[test]
    fn test_malformed_id_is_not_found_immediately() {
        let mut link = DeepLinkSync::new("/gallery");
        link.on_navigate("/gallery/sunset");
        assert_eq!(link.resolve(&Collection::new(), true, false), Resolution::NotFound(None));
    }

    #[test]
    fn test_back_to_grid_closes() {
        let mut link = DeepLinkSync::new("/gallery");
        link.on_navigate("/gallery");
        assert_eq!(link.resolve(&Collection::new(), true, true), Resolution::Close);
    }
}
