//! PhotoGallery - gallery viewing session host
//!
//! Usage: `photo_gallery [PATH]` where PATH is a gallery location such as
//! `/gallery` or `/gallery/42?favorites=3,7`.

mod app;

use anyhow::Result;
use gallery_core::GalleryConfig;

fn main() -> Result<()> {
    // Initialize logging and panic hook first
    let _log_guard = gallery_log::init()?;

    // Clean up old logs (7 days)
    if let Err(e) = gallery_log::cleanup_old_logs(7) {
        tracing::warn!("Failed to cleanup old logs: {}", e);
    }

    tracing::info!("PhotoGallery starting...");

    // Load configuration
    let config = GalleryConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Using default configuration: {}", e);
        GalleryConfig::default()
    });
    config.validate()?;

    let initial_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.deep_link.base_path.clone());

    app::run(config, initial_path)
}
