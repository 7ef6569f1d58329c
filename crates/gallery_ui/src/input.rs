//! Input handling and keybinding resolution

use gallery_core::{Command, CommandId};
use std::collections::HashMap;
use winit::event::{ElementState, KeyEvent, MouseButton};
use winit::keyboard::{Key, ModifiersState, NamedKey};

/// Input handler that maps keys/mouse to commands
pub struct InputHandler {
    /// Key bindings: key string -> command ID
    bindings: HashMap<String, String>,

    /// Current modifier state
    modifiers: ModifiersState,
}

impl InputHandler {
    /// Create an input handler from `command id -> key strings` bindings
    pub fn new(bindings: &HashMap<String, Vec<String>>) -> Self {
        let mut key_to_command = HashMap::new();

        for (command, keys) in bindings {
            for key in keys {
                if let Some(previous) = key_to_command.insert(key.to_lowercase(), command.clone()) {
                    tracing::warn!(key = %key, %previous, %command, "Key bound twice; last binding wins");
                }
            }
        }

        Self {
            bindings: key_to_command,
            modifiers: ModifiersState::empty(),
        }
    }

    pub fn update_modifiers(&mut self, modifiers: ModifiersState) {
        self.modifiers = modifiers;
    }

    /// Handle a winit key event
    pub fn handle_key(&self, event: &KeyEvent) -> Option<Command> {
        if event.repeat && !is_repeatable(&event.logical_key) {
            return None;
        }
        self.resolve(&event.logical_key, event.state)
    }

    /// Map a logical key press to its bound command
    pub fn resolve(&self, key: &Key, state: ElementState) -> Option<Command> {
        if state != ElementState::Pressed {
            return None;
        }

        let key_str = key_to_string(key)?;
        let full_key = self.build_key_string(&key_str);

        tracing::trace!("Key pressed: {}", full_key);

        self.bindings
            .get(&full_key.to_lowercase())
            .map(|cmd_id| Command::new(cmd_id))
    }

    /// Build a key string with modifiers
    fn build_key_string(&self, key: &str) -> String {
        let mut parts = Vec::new();

        if self.modifiers.control_key() {
            parts.push("Ctrl");
        }
        if self.modifiers.alt_key() {
            parts.push("Alt");
        }
        if self.modifiers.shift_key() {
            parts.push("Shift");
        }
        if self.modifiers.super_key() {
            parts.push("Super");
        }

        parts.push(key);
        parts.join("+")
    }

    /// Back/forward mouse buttons step through the lightbox
    pub fn handle_mouse_button(&self, button: MouseButton, state: ElementState) -> Option<Command> {
        if state != ElementState::Pressed {
            return None;
        }
        match button {
            MouseButton::Back => Some(Command::new(CommandId::LIGHTBOX_PREV)),
            MouseButton::Forward => Some(Command::new(CommandId::LIGHTBOX_NEXT)),
            _ => None,
        }
    }
}

/// Held arrows keep stepping; everything else fires once per press
fn is_repeatable(key: &Key) -> bool {
    matches!(
        key,
        Key::Named(NamedKey::ArrowLeft | NamedKey::ArrowRight | NamedKey::Tab)
    )
}

fn key_to_string(key: &Key) -> Option<String> {
    let s = match key {
        Key::Named(named) => match named {
            NamedKey::Space => "Space",
            NamedKey::Enter => "Return",
            NamedKey::Tab => "Tab",
            NamedKey::Escape => "Escape",
            NamedKey::Home => "Home",
            NamedKey::End => "End",
            NamedKey::ArrowUp => "Up",
            NamedKey::ArrowDown => "Down",
            NamedKey::ArrowLeft => "Left",
            NamedKey::ArrowRight => "Right",
            NamedKey::F11 => "F11",
            // Modifier keys alone never bind
            NamedKey::Shift | NamedKey::Control | NamedKey::Alt | NamedKey::Super => return None,
            other => return Some(format!("{:?}", other)),
        },
        // Shift is already part of the modifier prefix
        Key::Character(c) if c.as_str() == " " => "Space",
        Key::Character(c) => return Some(c.to_lowercase()),
        _ => return None,
    };
    Some(s.to_string())
}
