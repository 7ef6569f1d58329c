//! Gallery error types

use crate::model::ImageId;
use std::fmt;
use thiserror::Error;

/// Page fetch failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Non-2xx response; `message` is taken from the error payload when present
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid page response: {0}")]
    Decode(String),
}

impl FetchError {
    /// Build an HTTP error from a status code and the raw response body
    pub fn from_response(status: u16, body: &str) -> Self {
        let message =
            extract_error_message(body).unwrap_or_else(|| generic_status_message(status));
        FetchError::Http { status, message }
    }

    /// 4xx responses are final; everything else may succeed on retry
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Http { status, .. } => !(400..500).contains(status),
            FetchError::Network(_) | FetchError::Decode(_) => true,
        }
    }

    /// Message suitable for the retry affordance
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Http { message, .. } => message.clone(),
            FetchError::Network(_) => "Network error while loading images".to_string(),
            FetchError::Decode(_) => "The gallery returned an unexpected response".to_string(),
        }
    }
}

fn generic_status_message(status: u16) -> String {
    format!("Failed to load images (HTTP {})", status)
}

/// Pull a human-readable message out of a structured error payload.
///
/// Accepts `{"error": {"message": ..}}`, `{"error": ".."}` and `{"message": ".."}`.
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    let message = match value.get("error") {
        Some(serde_json::Value::String(s)) => Some(s.as_str()),
        Some(obj @ serde_json::Value::Object(_)) => obj.get("message").and_then(|m| m.as_str()),
        _ => None,
    }
    .or_else(|| value.get("message").and_then(|m| m.as_str()))?;

    let message = message.trim();
    (!message.is_empty()).then(|| message.to_string())
}

/// Host capabilities the subsystem can degrade without
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Fullscreen,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Fullscreen => f.write_str("fullscreen"),
        }
    }
}

/// Main gallery error type
#[derive(Error, Debug)]
pub enum GalleryError {
    // ===== Recoverable (surface a retry affordance) =====
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    // ===== Recoverable (routed or degraded) =====
    #[error("Image not found: {0}")]
    NotFound(ImageId),

    #[error("Unsupported capability: {0}")]
    UnsupportedCapability(Capability),

    #[error("Index {index} out of range for {len} images")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Gallery is empty")]
    EmptyCollection,

    // ===== Storage / configuration =====
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GalleryError {
    /// Is this error recoverable?
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, GalleryError::Config(_))
    }

    /// Get a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            GalleryError::Fetch(e) => e.user_message(),
            GalleryError::NotFound(id) => format!("Image {} could not be found", id),
            GalleryError::UnsupportedCapability(c) => format!("{} is not available", c),
            GalleryError::EmptyCollection => "No images to show yet".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<serde_json::Error> for GalleryError {
    fn from(e: serde_json::Error) -> Self {
        GalleryError::Storage(e.to_string())
    }
}
