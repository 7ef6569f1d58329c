//! Gallery configuration

use crate::command::CommandId;
use crate::page_source::RetryPolicy;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Main gallery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    pub api: ApiConfig,
    pub retry: RetryPolicy,
    pub window: WindowConfig,
    pub gestures: GestureConfig,
    pub indicator: IndicatorConfig,
    pub deep_link: DeepLinkConfig,
    pub favorites: FavoritesConfig,
    pub keybindings: HashMap<String, Vec<String>>,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            retry: RetryPolicy::default(),
            window: WindowConfig::default(),
            gestures: GestureConfig::default(),
            indicator: IndicatorConfig::default(),
            deep_link: DeepLinkConfig::default(),
            favorites: FavoritesConfig::default(),
            keybindings: default_keybindings(),
        }
    }
}

/// Page API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Page endpoint, queried with `limit` and `cursor`
    pub endpoint: String,
    pub page_size: u32,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000/api/gallery".to_string(),
            page_size: 24,
            timeout_secs: 15,
            user_agent: concat!("PhotoGallery/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Viewport windowing policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Extra pixels mounted above and below the viewport
    pub buffer_px: f64,
    /// Estimated height of one grid row
    pub item_height_px: f64,
    /// Collections smaller than this render unwindowed
    pub min_items_for_windowing: usize,
    /// Tallest viewport the window is sized for; caps the mounted row count
    pub max_viewport_height_px: f64,
    /// Ask for more data when the window ends within this many rows of the end
    pub end_threshold_rows: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            buffer_px: 1000.0,
            item_height_px: 320.0,
            min_items_for_windowing: 100,
            max_viewport_height_px: 2160.0,
            end_threshold_rows: 2,
        }
    }
}

/// Touch gesture thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub swipe_min_distance_px: f64,
    /// Minimum swipe velocity in px/ms
    pub swipe_min_velocity: f64,
    pub min_scale: f64,
    pub max_scale: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            swipe_min_distance_px: 50.0,
            swipe_min_velocity: 0.3,
            min_scale: 1.0,
            max_scale: 5.0,
        }
    }
}

/// Position indicator policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Collections smaller than this get one dot per image
    pub max_dots: usize,
    /// Fraction of viewport height excluded at top and bottom of the center band
    pub center_band_margin: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            max_dots: 10,
            center_band_margin: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeepLinkConfig {
    pub base_path: String,
    pub favorites_param: String,
}

impl Default for DeepLinkConfig {
    fn default() -> Self {
        Self {
            base_path: "/gallery".to_string(),
            favorites_param: "favorites".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FavoritesConfig {
    pub storage_key: String,
    /// Backing file for the key-value store; `None` uses the data directory
    pub store_path: Option<PathBuf>,
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self {
            storage_key: "gallery-favorites".to_string(),
            store_path: None,
        }
    }
}

impl FavoritesConfig {
    pub fn resolved_store_path(&self) -> PathBuf {
        self.store_path.clone().unwrap_or_else(|| {
            ProjectDirs::from("com", "PhotoGallery", "PhotoGallery")
                .map(|dirs| dirs.data_dir().join("storage.json"))
                .unwrap_or_else(|| PathBuf::from("./storage.json"))
        })
    }
}

impl GalleryConfig {
    /// Load configuration from the default location
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults when missing
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            tracing::info!("Configuration loaded from {:?}", path);
            Ok(config)
        } else {
            tracing::info!("Using default configuration");
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::info!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("com", "PhotoGallery", "PhotoGallery")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("./config.toml"))
    }

    /// Reject values the windowing and gesture math cannot work with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api.page_size == 0 {
            anyhow::bail!("api.page_size must be positive");
        }
        let numbers = [
            ("window.item_height_px", self.window.item_height_px),
            ("window.buffer_px", self.window.buffer_px),
            ("window.max_viewport_height_px", self.window.max_viewport_height_px),
            ("gestures.swipe_min_distance_px", self.gestures.swipe_min_distance_px),
            ("gestures.swipe_min_velocity", self.gestures.swipe_min_velocity),
            ("gestures.min_scale", self.gestures.min_scale),
            ("gestures.max_scale", self.gestures.max_scale),
        ];
        if let Some((name, _)) = numbers.iter().find(|(_, value)| !value.is_finite()) {
            anyhow::bail!("{} must be a finite number", name);
        }
        if self.window.item_height_px <= 0.0 {
            anyhow::bail!("window.item_height_px must be positive");
        }
        if self.window.buffer_px < 0.0 || self.window.max_viewport_height_px <= 0.0 {
            anyhow::bail!("window buffer and max viewport height must be non-negative");
        }
        if self.gestures.min_scale <= 0.0 || self.gestures.min_scale > self.gestures.max_scale {
            anyhow::bail!("gestures.min_scale must be positive and <= max_scale");
        }
        if !(0.0..0.5).contains(&self.indicator.center_band_margin) {
            anyhow::bail!("indicator.center_band_margin must be in [0, 0.5)");
        }
        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }
        Ok(())
    }
}

fn default_keybindings() -> HashMap<String, Vec<String>> {
    let mut kb = HashMap::new();

    // Lightbox
    kb.insert(CommandId::LIGHTBOX_NEXT.into(), vec!["Right".into()]);
    kb.insert(CommandId::LIGHTBOX_PREV.into(), vec!["Left".into()]);
    kb.insert(CommandId::LIGHTBOX_ESCAPE.into(), vec!["Escape".into()]);

    // Gallery grid
    kb.insert(CommandId::GALLERY_OPEN_FOCUSED.into(), vec!["Return".into(), "Space".into()]);
    kb.insert(CommandId::GALLERY_LOAD_MORE.into(), vec!["r".into()]);

    // Focus containment
    kb.insert(CommandId::FOCUS_NEXT.into(), vec!["Tab".into()]);
    kb.insert(CommandId::FOCUS_PREV.into(), vec!["Shift+Tab".into()]);

    // View
    kb.insert(CommandId::VIEW_TOGGLE_FULLSCREEN.into(), vec!["f".into()]);
    kb.insert(CommandId::FAVORITES_TOGGLE.into(), vec!["s".into()]);

    kb
}
