//! PhotoGallery UI Layer
//!
//! Provides:
//! - Keybinding resolution and touch gestures
//! - Focus containment for modals
//! - Position indicator and fullscreen capability
//! - The session that routes events between components

pub mod input;
pub mod gesture;
pub mod focus;
pub mod indicator;
pub mod fullscreen;
pub mod session;

pub use input::InputHandler;
pub use gesture::{PinchRecognizer, Swipe, SwipeRecognizer, TouchInput};
pub use focus::{FocusController, FocusHost, FocusableNode, ScopeId};
pub use indicator::{IndicatorAction, IndicatorMode, PositionIndicator, VisibilityEntry};
pub use fullscreen::FullscreenState;
pub use session::{Effect, GallerySession, SessionElements};
