use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{GenerativeBackend, ScriptRequest, SpeechRequest, VideoJob, VideoRequest};
use crate::audio;
use crate::config::VideoConfig;
use crate::media::{MediaHandle, MediaKind, MediaLibrary};
use crate::state::{Scene, Speaker};
use crate::{Result, StudioError};

/// Quality qualifiers appended to every visual prompt
pub const VIDEO_STYLE_SUFFIX: &str =
    ", cinematic 4k, octane render, unreal engine 5, masterwork, blender 3d style";

/// Prompt actually sent to the video backend
pub fn styled_prompt(visual_prompt: &str) -> String {
    format!("{}{}", visual_prompt, VIDEO_STYLE_SUFFIX)
}

/// Request/response client for script, video and narration generation.
///
/// Failures propagate to the caller; nothing is retried here.
#[derive(Clone)]
pub struct GenerationClient {
    backend: Arc<dyn GenerativeBackend>,
    media: MediaLibrary,
    video: VideoConfig,
}

impl GenerationClient {
    pub fn new(backend: Arc<dyn GenerativeBackend>, media: MediaLibrary, video: VideoConfig) -> Self {
        Self {
            backend,
            media,
            video,
        }
    }

    pub fn media(&self) -> &MediaLibrary {
        &self.media
    }

    pub fn provider_name(&self) -> &str {
        self.backend.provider_name()
    }

    /// Write a 3-5 scene script for a pitch
    pub async fn generate_script(&self, pitch: &str) -> Result<Vec<Scene>> {
        debug!("Requesting script for pitch ({} chars)", pitch.len());

        let request = ScriptRequest::for_pitch(pitch);
        let content = self.backend.generate_script(&request).await?;
        let scenes = super::script::parse_script(&content)?;

        info!("📝 Script generated with {} scenes", scenes.len());
        Ok(scenes)
    }

    /// Synthesize a clip for a visual prompt and register it as a video handle.
    ///
    /// Waits for the job by polling at the configured interval; the wait is
    /// bounded by the configured poll timeout when one is set.
    pub async fn generate_video(&self, visual_prompt: &str) -> Result<MediaHandle> {
        let request = VideoRequest {
            prompt: styled_prompt(visual_prompt),
            number_of_videos: self.video.number_of_videos,
            resolution: self.video.resolution.clone(),
            aspect_ratio: self.video.aspect_ratio.clone(),
        };

        let job = match self.video.poll_timeout() {
            Some(limit) => tokio::time::timeout(limit, self.wait_for_video(&request))
                .await
                .map_err(|_| StudioError::Timeout(limit))??,
            None => self.wait_for_video(&request).await?,
        };

        if let Some(message) = job.error {
            return Err(StudioError::VideoGeneration(message));
        }

        let uri = job
            .video_uri
            .ok_or_else(|| StudioError::VideoGeneration("no URI returned".to_string()))?;

        let bytes = self.backend.download_video(&uri).await?;
        let handle = self.media.register(MediaKind::Video, bytes).await;

        info!("🎞️ Video ready: {}", handle);
        Ok(handle)
    }

    async fn wait_for_video(&self, request: &VideoRequest) -> Result<VideoJob> {
        let interval: Duration = self.video.poll_interval();
        let mut job = self.backend.submit_video(request).await?;
        let mut polls = 0u32;

        while !job.done {
            tokio::time::sleep(interval).await;
            polls += 1;
            debug!(operation = %job.name, polls, "Polling video job");
            job = self.backend.poll_video(&job).await?;
        }

        debug!(operation = %job.name, polls, "Video job finished");
        Ok(job)
    }

    /// Narrate a script with the speaker's voice and register it as a WAV handle
    pub async fn generate_audio(&self, audio_script: &str, speaker: Speaker) -> Result<MediaHandle> {
        let request = SpeechRequest {
            script: audio_script.to_string(),
            voice_name: speaker.voice_name().to_string(),
        };

        let payload = self
            .backend
            .synthesize_speech(&request)
            .await?
            .filter(|data| !data.trim().is_empty())
            .ok_or_else(|| StudioError::AudioGeneration("no audio payload returned".to_string()))?;

        let pcm = audio::decode_base64(&payload)?;
        let wav = audio::pcm16_to_wav(&pcm);
        let handle = self.media.register(MediaKind::Audio, wav).await;

        info!(
            "🎙️ Narration ready: {} ({:.1}s, voice {})",
            handle,
            audio::wav_duration(audio::wav_sample_count(handle.byte_len)).as_secs_f64(),
            request.voice_name
        );
        Ok(handle)
    }
}
