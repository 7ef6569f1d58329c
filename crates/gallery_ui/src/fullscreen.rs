//! Fullscreen capability
//!
//! Some hosts cannot go fullscreen at all. Then the control is hidden and the
//! toggle reports [`GalleryError::UnsupportedCapability`] instead of doing
//! anything visible.

use gallery_core::{Capability, GalleryError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullscreenState {
    supported: bool,
    active: bool,
}

impl FullscreenState {
    pub fn new(supported: bool) -> Self {
        if !supported {
            tracing::info!("Fullscreen not supported; control hidden");
        }
        Self {
            supported,
            active: false,
        }
    }

    /// Whether to show the fullscreen control at all
    pub fn is_available(&self) -> bool {
        self.supported
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Flip fullscreen; returns the requested state
    pub fn toggle(&mut self) -> Result<bool, GalleryError> {
        if !self.supported {
            return Err(GalleryError::UnsupportedCapability(Capability::Fullscreen));
        }
        self.active = !self.active;
        tracing::debug!(active = self.active, "Fullscreen toggled");
        Ok(self.active)
    }

    /// Leave fullscreen; `true` if it was active
    pub fn exit(&mut self) -> bool {
        std::mem::replace(&mut self.active, false)
    }

    /// The host left or entered fullscreen on its own (e.g. platform shortcut)
    pub fn sync_from_host(&mut self, active: bool) {
        self.active = active && self.supported;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_and_exit() {
        let mut fs = FullscreenState::new(true);
        assert!(fs.toggle().unwrap());
        assert!(fs.exit());
        assert!(!fs.exit());
    }

    #[test]
    fn test_unsupported_degrades() {
        let mut fs = FullscreenState::new(false);
        assert!(!fs.is_available());
        assert!(matches!(
            fs.toggle(),
            Err(GalleryError::UnsupportedCapability(Capability::Fullscreen))
        ));
        fs.sync_from_host(true);
        assert!(!fs.is_active());
    }
}
