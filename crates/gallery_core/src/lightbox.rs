//! Lightbox navigation state machine
//!
//! Two states, `Closed` and `Open`. The lightbox never owns images: every
//! transition reads the collection it is handed. `current_index` survives a
//! close so reopening resumes where the visitor left off.

use crate::error::GalleryError;
use crate::model::{Collection, ElementId, Image, ImageId};
use crate::scroll_lock::{ScrollGuard, ScrollLock};

/// What to open the lightbox on
#[derive(Debug, Clone, Copy)]
pub enum OpenTarget<'a> {
    Index(usize),
    Image(&'a Image),
    Id(ImageId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightboxState {
    pub is_open: bool,
    pub current_index: usize,
    /// Control that opened the lightbox; focus returns here on close
    pub trigger: Option<ElementId>,
}

impl Default for LightboxState {
    fn default() -> Self {
        Self {
            is_open: false,
            current_index: 0,
            trigger: None,
        }
    }
}

/// Observable result of a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LightboxEvent {
    Opened { index: usize },
    Moved { from: usize, to: usize },
    Closed {
        index: usize,
        /// Where focus should go once the closing frame has rendered
        restore_focus: Option<ElementId>,
    },
}

type CloseCallback = Box<dyn FnMut(usize) + Send>;

pub struct Lightbox {
    state: LightboxState,
    current_id: Option<ImageId>,
    scroll_lock: ScrollLock,
    scroll_guard: Option<ScrollGuard>,
    on_close: Option<CloseCallback>,
}

impl Lightbox {
    pub fn new(scroll_lock: ScrollLock) -> Self {
        Self {
            state: LightboxState::default(),
            current_id: None,
            scroll_lock,
            scroll_guard: None,
            on_close: None,
        }
    }

    /// Callback invoked with the last index after every close
    pub fn set_on_close(&mut self, callback: impl FnMut(usize) + Send + 'static) {
        self.on_close = Some(Box::new(callback));
    }

    pub fn state(&self) -> &LightboxState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open
    }

    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    /// Id of the image last shown
    pub fn current_id(&self) -> Option<ImageId> {
        self.current_id
    }

    fn resolve(target: OpenTarget<'_>, collection: &Collection) -> Result<usize, GalleryError> {
        if collection.is_empty() {
            return Err(GalleryError::EmptyCollection);
        }
        match target {
            OpenTarget::Index(index) if index < collection.len() => Ok(index),
            OpenTarget::Index(index) => Err(GalleryError::IndexOutOfRange {
                index,
                len: collection.len(),
            }),
            OpenTarget::Image(image) => collection
                .index_of(image.id)
                .ok_or(GalleryError::NotFound(image.id)),
            OpenTarget::Id(id) => collection.index_of(id).ok_or(GalleryError::NotFound(id)),
        }
    }

    /// Open on `target`, or re-seek if already open.
    ///
    /// On error the state is left unchanged. Re-seeking keeps the original
    /// trigger unless a new one is given.
    pub fn open(
        &mut self,
        target: OpenTarget<'_>,
        trigger: Option<ElementId>,
        collection: &Collection,
    ) -> Result<LightboxEvent, GalleryError> {
        let index = Self::resolve(target, collection)?;

        if self.scroll_guard.is_none() {
            self.scroll_guard = Some(self.scroll_lock.acquire());
        }
        if trigger.is_some() || !self.state.is_open {
            self.state.trigger = trigger;
        }
        self.state.is_open = true;
        self.set_index(index, collection);

        tracing::debug!(index, id = ?self.current_id, "Lightbox opened");
        Ok(LightboxEvent::Opened { index })
    }

    /// Close; `None` if already closed
    pub fn close(&mut self) -> Option<LightboxEvent> {
        if !self.state.is_open {
            return None;
        }

        self.state.is_open = false;
        self.scroll_guard = None;
        let restore_focus = self.state.trigger.take();
        let index = self.state.current_index;

        if let Some(callback) = self.on_close.as_mut() {
            callback(index);
        }

        tracing::debug!(index, "Lightbox closed");
        Some(LightboxEvent::Closed {
            index,
            restore_focus,
        })
    }

    /// Next image, wrapping from the last to the first
    pub fn go_to_next(&mut self, collection: &Collection) -> Option<LightboxEvent> {
        let len = collection.len();
        if !self.state.is_open || len == 0 {
            return None;
        }
        let to = (self.state.current_index + 1) % len;
        Some(self.move_to(to, collection))
    }

    /// Previous image, wrapping from the first to the last
    pub fn go_to_previous(&mut self, collection: &Collection) -> Option<LightboxEvent> {
        let len = collection.len();
        if !self.state.is_open || len == 0 {
            return None;
        }
        let to = (self.state.current_index + len - 1) % len;
        Some(self.move_to(to, collection))
    }

    /// Seek to `index`, clamped to the collection; does not wrap
    pub fn go_to(&mut self, index: usize, collection: &Collection) -> Option<LightboxEvent> {
        let len = collection.len();
        if !self.state.is_open || len == 0 {
            return None;
        }
        Some(self.move_to(index.min(len - 1), collection))
    }

    fn move_to(&mut self, to: usize, collection: &Collection) -> LightboxEvent {
        let from = self.state.current_index;
        self.set_index(to, collection);
        tracing::debug!(from, to, "Lightbox moved");
        LightboxEvent::Moved { from, to }
    }

    fn set_index(&mut self, index: usize, collection: &Collection) {
        self.state.current_index = index;
        self.current_id = collection.get(index).map(|img| img.id);
    }

    /// Follow the shown image after a merge shifted indices.
    ///
    /// Returns `true` if `current_index` changed.
    pub fn reconcile(&mut self, collection: &Collection) -> bool {
        let Some(id) = self.current_id else {
            return false;
        };
        match collection.index_of(id) {
            Some(index) if index != self.state.current_index => {
                tracing::debug!(id, from = self.state.current_index, to = index, "Lightbox re-anchored");
                self.state.current_index = index;
                true
            }
            _ => false,
        }
    }
}
