//! Command system for user intents

use serde::{Deserialize, Serialize};

/// Command identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandId(pub String);

impl CommandId {
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    // Lightbox commands
    pub const LIGHTBOX_NEXT: &'static str = "lightbox.next";
    pub const LIGHTBOX_PREV: &'static str = "lightbox.prev";
    /// Exit fullscreen if active, otherwise close
    pub const LIGHTBOX_ESCAPE: &'static str = "lightbox.escape";
    pub const LIGHTBOX_CLOSE: &'static str = "lightbox.close";
    pub const LIGHTBOX_GO_TO: &'static str = "lightbox.go_to";

    // Gallery grid commands
    pub const GALLERY_OPEN_FOCUSED: &'static str = "gallery.open_focused";
    pub const GALLERY_LOAD_MORE: &'static str = "gallery.load_more";

    // Focus containment
    pub const FOCUS_NEXT: &'static str = "focus.next";
    pub const FOCUS_PREV: &'static str = "focus.prev";

    // View commands
    pub const VIEW_TOGGLE_FULLSCREEN: &'static str = "view.toggle_fullscreen";
    pub const FAVORITES_TOGGLE: &'static str = "favorites.toggle";
}

/// Command with optional parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub id: CommandId,
    pub params: CommandParams,
}

/// Command parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandParams {
    pub int_value: Option<i64>,
}

impl Command {
    pub fn new(id: &str) -> Self {
        Self {
            id: CommandId::new(id),
            params: CommandParams::default(),
        }
    }

    pub fn with_int(mut self, value: i64) -> Self {
        self.params.int_value = Some(value);
        self
    }

    pub fn is(&self, id: &str) -> bool {
        self.id.as_str() == id
    }

    /// Integer parameter as an index, if present and non-negative
    pub fn index_param(&self) -> Option<usize> {
        self.params.int_value.and_then(|v| usize::try_from(v).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_param() {
        assert_eq!(Command::new(CommandId::LIGHTBOX_GO_TO).with_int(4).index_param(), Some(4));
        assert_eq!(Command::new(CommandId::LIGHTBOX_GO_TO).with_int(-1).index_param(), None);
        assert!(Command::new(CommandId::LIGHTBOX_NEXT).is("lightbox.next"));
    }
}
