//! PhotoGallery Core Domain Logic
//!
//! This crate contains:
//! - Image model and ordered collection
//! - Cursor pagination and the page source
//! - Viewport windowing
//! - Lightbox state machine and scroll lock
//! - Deep links and favorites
//! - Command system
//! - Configuration
//! - Error types

pub mod model;
pub mod config;
pub mod command;
pub mod error;
pub mod page_source;
pub mod pagination;
pub mod window;
pub mod scroll_lock;
pub mod lightbox;
pub mod deep_link;
pub mod favorites;

pub use model::{Collection, Cursor, ElementId, Image, ImageId, MergeStats, PageInfo, PageRequest, PageResponse};
pub use config::{
    ApiConfig, DeepLinkConfig, FavoritesConfig, GalleryConfig, GestureConfig,
    IndicatorConfig, WindowConfig,
};
pub use command::{Command, CommandId, CommandParams};
pub use error::{Capability, FetchError, GalleryError};
pub use page_source::{fetch_with_retry, HttpPageSource, PageSource, RetryPolicy};
pub use pagination::{LoadOutcome, PageTicket, PaginationAccumulator};
pub use window::{
    LoadPriority, RecomputeThrottle, Viewport, WindowCalculator, WindowRange,
    WindowSignal, WindowUpdate,
};
pub use scroll_lock::{NoopScrollHost, ScrollGuard, ScrollHost, ScrollLock};
pub use lightbox::{Lightbox, LightboxEvent, LightboxState, OpenTarget};
pub use deep_link::{DeepLinkSync, LinkTarget, Location, Resolution};
pub use favorites::{Favorites, FileStore, KeyValueStore, MemoryStore, StoreError};
