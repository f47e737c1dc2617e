/// CineNode Studio - Rust Implementation
///
/// Turns a one-line movie pitch into a storyboard of scenes, generates a video
/// clip and a narration clip for each scene, and sequences them for playback.

pub mod audio;
pub mod config;
pub mod export;
pub mod generation;
pub mod media;
pub mod playback;
pub mod production;
pub mod state;

use std::time::Duration;

// Re-export main types for easy access
pub use crate::config::{Config, ConfigBuilder, HostCapabilities};
pub use crate::export::{ProjectExporter, ProductionSummary};
pub use crate::generation::{create_backend, GenerationClient, GenerativeBackend};
pub use crate::media::{MediaHandle, MediaKind, MediaLibrary};
pub use crate::playback::{Cue, PlaybackEvent, PlaybackSequencer};
pub use crate::production::ProductionOrchestrator;
pub use crate::state::{Project, ProjectStore, Scene, SceneStatus, Speaker};

/// Result type for studio operations
pub type Result<T> = std::result::Result<T, StudioError>;

/// Error types for studio operations
#[derive(thiserror::Error, Debug)]
pub enum StudioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Script parsing error: {0}")]
    Parse(String),

    #[error("Video generation failed: {0}")]
    VideoGeneration(String),

    #[error("Audio generation failed: {0}")]
    AudioGeneration(String),

    #[error("Video generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("No API key selected")]
    CredentialMissing,

    #[error("Pitch must not be empty")]
    InvalidPitch,

    #[error("No project has been started")]
    NoProject,

    #[error("Scene not found: {0}")]
    SceneNotFound(String),

    #[error("Project not ready: {0}")]
    NotReady(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}
