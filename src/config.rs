use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Result, StudioError};

/// Configuration for CineNode Studio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Generative backend settings
    pub generation: GenerationConfig,

    /// Video job submission and polling
    pub video: VideoConfig,

    /// Scene production settings
    pub production: ProductionConfig,

    /// Logging and output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of the generative language API
    pub base_url: String,

    /// API key for all backend calls
    pub api_key: Option<String>,

    /// Model used to write the script
    pub script_model: String,

    /// Model used for video synthesis
    pub video_model: String,

    /// Model used for narration
    pub speech_model: String,

    /// Timeout for a single HTTP request in seconds
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Delay between status polls of a running video job
    pub poll_interval_seconds: u64,

    /// Upper bound on the whole poll loop (None = wait forever)
    pub poll_timeout_seconds: Option<u64>,

    pub resolution: String,

    pub aspect_ratio: String,

    pub number_of_videos: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionConfig {
    /// Maximum number of generation calls in flight during a full production
    pub max_concurrent_generations: usize,

    /// Directory clips are exported to after production
    pub export_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Log level
    pub log_level: String,
}

impl VideoConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        self.poll_timeout_seconds.map(Duration::from_secs)
    }
}

/// Host capabilities resolved once at startup and handed to the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostCapabilities {
    /// An access credential has been selected
    pub key_selected: bool,
}

impl HostCapabilities {
    pub fn resolve(config: &Config) -> Self {
        Self {
            key_selected: config
                .generation
                .api_key
                .as_deref()
                .map_or(false, |key| !key.trim().is_empty()),
        }
    }
}

impl Config {
    /// Load configuration from the first config file found, falling back to
    /// environment variables
    pub fn load() -> Result<Self> {
        let config_paths = ["cinenode.toml", "config/cinenode.toml"];

        for path in &config_paths {
            let path = Path::new(path);
            if path.exists() {
                match Self::load_from(path) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to parse config file {}: {}", path.display(), e),
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from a specific TOML file; environment overrides
    /// still apply on top of it
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&config_str)
            .map_err(|e| StudioError::Configuration(format!("{}: {}", path.display(), e)))?;

        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config.with_env_overrides())
    }

    /// Default configuration with environment variables applied
    pub fn from_env() -> Result<Self> {
        Ok(Self::default().with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        for var in ["CINENODE_API_KEY", "GEMINI_API_KEY", "API_KEY"] {
            if let Ok(api_key) = std::env::var(var) {
                if !api_key.trim().is_empty() {
                    self.generation.api_key = Some(api_key);
                    break;
                }
            }
        }

        if let Ok(base_url) = std::env::var("CINENODE_BASE_URL") {
            self.generation.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("CINENODE_POLL_TIMEOUT") {
            self.video.poll_timeout_seconds = match timeout.parse::<u64>() {
                Ok(0) => None,
                Ok(secs) => Some(secs),
                Err(_) => self.video.poll_timeout_seconds,
            };
        }

        if let Ok(log_level) = std::env::var("CINENODE_LOG_LEVEL") {
            self.output.log_level = log_level;
        }

        self
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)
            .map_err(|e| StudioError::Configuration(e.to_string()))?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.video.poll_interval_seconds == 0 {
            return Err(StudioError::Configuration(
                "poll_interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.video.poll_timeout_seconds == Some(0) {
            return Err(StudioError::Configuration(
                "poll_timeout_seconds must be greater than 0 when set".to_string(),
            ));
        }

        if self.production.max_concurrent_generations == 0 {
            return Err(StudioError::Configuration(
                "max_concurrent_generations must be greater than 0".to_string(),
            ));
        }

        let models = [
            &self.generation.script_model,
            &self.generation.video_model,
            &self.generation.speech_model,
        ];
        if models.iter().any(|m| m.trim().is_empty()) {
            return Err(StudioError::Configuration("model names must not be empty".to_string()));
        }

        url::Url::parse(&self.generation.base_url)?;

        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "CineNode Studio Configuration:\n\
            - Script Model: {}\n\
            - Video Model: {} ({}, {})\n\
            - Speech Model: {}\n\
            - Poll Interval: {}s\n\
            - Poll Timeout: {}\n\
            - Concurrent Generations: {}\n\
            - API Key Selected: {}",
            self.generation.script_model,
            self.generation.video_model,
            self.video.resolution,
            self.video.aspect_ratio,
            self.generation.speech_model,
            self.video.poll_interval_seconds,
            self.video
                .poll_timeout_seconds
                .map_or("none".to_string(), |s| format!("{}s", s)),
            self.production.max_concurrent_generations,
            HostCapabilities::resolve(self).key_selected
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            generation: GenerationConfig {
                base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                api_key: None,
                script_model: "gemini-3-pro-preview".to_string(),
                video_model: "veo-3.1-fast-generate-preview".to_string(),
                speech_model: "gemini-2.5-flash-preview-tts".to_string(),
                request_timeout_seconds: 300,
            },
            video: VideoConfig {
                poll_interval_seconds: 10,
                poll_timeout_seconds: Some(1200), // 20 minutes
                resolution: "720p".to_string(),
                aspect_ratio: "16:9".to_string(),
                number_of_videos: 1,
            },
            production: ProductionConfig {
                max_concurrent_generations: num_cpus::get().clamp(1, 4),
                export_dir: None,
            },
            output: OutputConfig {
                log_level: "info".to_string(),
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.config.generation.api_key = Some(api_key);
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.config.generation.base_url = base_url;
        self
    }

    pub fn with_poll_interval(mut self, seconds: u64) -> Self {
        self.config.video.poll_interval_seconds = seconds;
        self
    }

    pub fn with_poll_timeout(mut self, seconds: Option<u64>) -> Self {
        self.config.video.poll_timeout_seconds = seconds;
        self
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.config.production.max_concurrent_generations = max;
        self
    }

    pub fn with_export_dir(mut self, dir: PathBuf) -> Self {
        self.config.production.export_dir = Some(dir);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
