pub mod client;
pub mod providers;
pub mod script;

pub use client::GenerationClient;
pub use providers::GeminiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::GenerationConfig;
use crate::Result;

/// Script request: instruction text plus the JSON schema the answer must match
#[derive(Debug, Clone, Serialize)]
pub struct ScriptRequest {
    pub instruction: String,
    pub response_schema: serde_json::Value,
}

/// Long-running video synthesis request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoRequest {
    pub prompt: String,
    pub number_of_videos: u32,
    pub resolution: String,
    pub aspect_ratio: String,
}

/// State of a video synthesis job as last reported by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct VideoJob {
    /// Backend identifier used to fetch the job status
    pub name: String,
    pub done: bool,
    /// Downloadable locator of the first generated clip
    pub video_uri: Option<String>,
    /// Error reported by the backend for a finished job
    pub error: Option<String>,
}

/// Speech synthesis request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeechRequest {
    pub script: String,
    pub voice_name: String,
}

/// Trait for generative backends
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Raw JSON text answering a script request
    async fn generate_script(&self, request: &ScriptRequest) -> Result<String>;

    /// Submit a video job
    async fn submit_video(&self, request: &VideoRequest) -> Result<VideoJob>;

    /// Refresh the status of a previously submitted job
    async fn poll_video(&self, job: &VideoJob) -> Result<VideoJob>;

    /// Fetch the bytes behind a finished job's locator
    async fn download_video(&self, uri: &str) -> Result<Vec<u8>>;

    /// Base64 raw PCM narration, or `None` if the response carried no audio
    async fn synthesize_speech(&self, request: &SpeechRequest) -> Result<Option<String>>;

    fn provider_name(&self) -> &str;
}

/// Create the backend described by the configuration
pub fn create_backend(config: &GenerationConfig) -> Result<Arc<dyn GenerativeBackend>> {
    Ok(Arc::new(GeminiProvider::new(config.clone())?))
}
