use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{GenerativeBackend, ScriptRequest, SpeechRequest, VideoJob, VideoRequest};
use crate::config::GenerationConfig;
use crate::{Result, StudioError};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini / Veo provider implementation
pub struct GeminiProvider {
    config: GenerationConfig,
    api_key: String,
    client: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    #[serde(default)]
    mime_type: Option<String>,
    data: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

impl GenerateContentResponse {
    fn first_part(&self) -> Option<&GeminiPart> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
    }
}

#[derive(Debug, Serialize)]
struct PredictLongRunningRequest {
    instances: Vec<VideoInstance>,
    parameters: VideoParameters,
}

#[derive(Debug, Serialize)]
struct VideoInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoParameters {
    sample_count: u32,
    resolution: String,
    aspect_ratio: String,
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    response: Option<OperationResponse>,
    error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: Option<GeneratedVideo>,
}

#[derive(Debug, Deserialize)]
struct GeneratedVideo {
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    message: String,
}

impl From<Operation> for VideoJob {
    fn from(operation: Operation) -> Self {
        let video_uri = operation
            .response
            .and_then(|r| r.generate_video_response)
            .and_then(|r| r.generated_samples.into_iter().next())
            .and_then(|s| s.video)
            .and_then(|v| v.uri);

        VideoJob {
            name: operation.name,
            done: operation.done,
            video_uri,
            error: operation.error.map(|e| e.message),
        }
    }
}

impl GeminiProvider {
    pub fn new(config: GenerationConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(StudioError::CredentialMissing)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.config.base_url.trim_end_matches('/'),
            model,
            method
        )
    }

    async fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<Response> {
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;

        check_status(response).await
    }

    async fn generate_content(&self, model: &str, request: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        let url = self.model_url(model, "generateContent");
        debug!("Sending generateContent request to {}", model);

        let response = self.post_json(&url, request).await?;
        Ok(response.json().await?)
    }
}

/// Turn a non-success status into an API error carrying the response body
async fn check_status(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    Err(StudioError::Api { status, message })
}

/// Append the access credential to a download locator as a `key` parameter
pub fn authorized_download_url(uri: &str, api_key: &str) -> Result<Url> {
    let mut url = Url::parse(uri)?;
    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url)
}

#[async_trait]
impl GenerativeBackend for GeminiProvider {
    async fn generate_script(&self, request: &ScriptRequest) -> Result<String> {
        let body = GenerateContentRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: Some(request.instruction.clone()),
                    inline_data: None,
                }],
            }],
            generation_config: GeminiGenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(request.response_schema.clone()),
                ..Default::default()
            },
        };

        let response = self.generate_content(&self.config.script_model, &body).await?;

        response
            .first_part()
            .and_then(|p| p.text.clone())
            .ok_or_else(|| StudioError::Parse("no script text returned".to_string()))
    }

    async fn submit_video(&self, request: &VideoRequest) -> Result<VideoJob> {
        let url = self.model_url(&self.config.video_model, "predictLongRunning");
        let body = PredictLongRunningRequest {
            instances: vec![VideoInstance {
                prompt: request.prompt.clone(),
            }],
            parameters: VideoParameters {
                sample_count: request.number_of_videos,
                resolution: request.resolution.clone(),
                aspect_ratio: request.aspect_ratio.clone(),
            },
        };

        debug!("Submitting video job to {}", self.config.video_model);
        let operation: Operation = self.post_json(&url, &body).await?.json().await?;
        Ok(operation.into())
    }

    async fn poll_video(&self, job: &VideoJob) -> Result<VideoJob> {
        let url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            job.name.trim_start_matches('/')
        );

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let operation: Operation = check_status(response).await?.json().await?;
        Ok(operation.into())
    }

    async fn download_video(&self, uri: &str) -> Result<Vec<u8>> {
        let url = authorized_download_url(uri, &self.api_key)?;
        debug!("Downloading generated video");

        let response = check_status(self.client.get(url).send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn synthesize_speech(&self, request: &SpeechRequest) -> Result<Option<String>> {
        let body = GenerateContentRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: Some(request.script.clone()),
                    inline_data: None,
                }],
            }],
            generation_config: GeminiGenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: request.voice_name.clone(),
                        },
                    },
                }),
                ..Default::default()
            },
        };

        let response = self.generate_content(&self.config.speech_model, &body).await?;

        Ok(response
            .first_part()
            .and_then(|p| p.inline_data.as_ref())
            .map(|d| d.data.clone()))
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }
}
