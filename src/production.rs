use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::config::HostCapabilities;
use crate::export::ProductionSummary;
use crate::generation::GenerationClient;
use crate::media::{MediaKind, MediaLibrary};
use crate::state::{Project, ProjectStore, Scene};
use crate::{Result, StudioError};

/// Drives the per-scene generation lifecycle and keeps the project store
/// current.
///
/// Each action marks its scene as generating before the backend call is
/// awaited and then applies exactly one terminal update: `completed` with the
/// new handle, or `error` with the handles left as they were. Actions may be
/// re-triggered from any status.
#[derive(Clone)]
pub struct ProductionOrchestrator {
    client: GenerationClient,
    store: ProjectStore,
    capabilities: HostCapabilities,
    semaphore: Arc<Semaphore>,
}

impl ProductionOrchestrator {
    pub fn new(client: GenerationClient, capabilities: HostCapabilities, max_concurrent: usize) -> Self {
        Self {
            client,
            store: ProjectStore::new(),
            capabilities,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    pub fn media(&self) -> &MediaLibrary {
        self.client.media()
    }

    pub async fn project(&self) -> Option<Arc<Project>> {
        self.store.snapshot().await
    }

    pub async fn summary(&self) -> Result<ProductionSummary> {
        let project = self.store.snapshot().await.ok_or(StudioError::NoProject)?;
        Ok(ProductionSummary::of(&project))
    }

    fn ensure_key_selected(&self) -> Result<()> {
        if self.capabilities.key_selected {
            Ok(())
        } else {
            Err(StudioError::CredentialMissing)
        }
    }

    /// Write a script for the pitch and install it as the active project.
    ///
    /// On failure the store is left as it was.
    pub async fn start_project(&self, pitch: &str) -> Result<Arc<Project>> {
        self.ensure_key_selected()?;

        if pitch.trim().is_empty() {
            return Err(StudioError::InvalidPitch);
        }

        info!("🎥 Directing scenes for pitch: {}", pitch);
        let scenes = self.client.generate_script(pitch).await.map_err(|e| {
            error!("Failed to generate script: {}", e);
            e
        })?;

        let (project, previous) = self.store.replace_project(Project::new(pitch, scenes)).await;
        if let Some(previous) = previous {
            self.release_project_media(&previous).await;
        }

        Ok(project)
    }

    /// Revoke every clip held by a project that is no longer active
    async fn release_project_media(&self, project: &Project) {
        let mut released = 0;
        for handle in project.scenes.iter().flat_map(|s| s.video.iter().chain(s.audio.iter())) {
            if self.media().revoke(handle).await {
                released += 1;
            }
        }

        if released > 0 {
            debug!("Released {} clips of replaced project '{}'", released, project.title);
        }
    }

    /// Generate (or regenerate) the video track of a scene
    pub async fn generate_video(&self, scene_id: &str) -> Result<Scene> {
        self.run_track(scene_id, MediaKind::Video).await
    }

    /// Generate (or regenerate) the narration track of a scene
    pub async fn generate_audio(&self, scene_id: &str) -> Result<Scene> {
        self.run_track(scene_id, MediaKind::Audio).await
    }

    async fn run_track(&self, scene_id: &str, kind: MediaKind) -> Result<Scene> {
        self.ensure_key_selected()?;

        let scene = self
            .store
            .update_scene(scene_id, |s| {
                if s.status.is_generating() {
                    debug!(scene_id = %scene_id, "Re-triggered while {}", s.status);
                }
                s.start_generating(kind)
            })
            .await?;

        let outcome = match kind {
            MediaKind::Video => self.client.generate_video(&scene.visual_prompt).await,
            MediaKind::Audio => {
                self.client
                    .generate_audio(&scene.audio_script, scene.speaker)
                    .await
            }
        };

        match outcome {
            Ok(handle) => {
                let mut superseded = None;
                let applied = self
                    .store
                    .update_scene(scene_id, |current| {
                        superseded = current.handle(kind).cloned();
                        current.complete_with(handle.clone())
                    })
                    .await;

                // The project was replaced while the track was generating
                let updated = match applied {
                    Ok(updated) => updated,
                    Err(e) => {
                        warn!(scene_id = %scene_id, "Discarding {:?} track: {}", kind, e);
                        self.media().revoke(&handle).await;
                        return Err(e);
                    }
                };

                if let Some(old) = superseded {
                    self.media().revoke(&old).await;
                }

                info!(scene_id = %scene_id, "✅ Scene '{}' {:?} track completed", updated.title, kind);
                Ok(updated)
            }
            Err(e) => {
                error!(scene_id = %scene_id, "❌ Scene '{}' {:?} track failed: {}", scene.title, kind, e);
                self.store
                    .update_scene(scene_id, |current| current.fail_with(e.to_string()))
                    .await
            }
        }
    }

    /// Generate every missing track of every scene, bounded by the configured
    /// concurrency. Individual failures end up as scene `error` status.
    pub async fn produce_all(&self) -> Result<ProductionSummary> {
        self.ensure_key_selected()?;

        let project = self.store.snapshot().await.ok_or(StudioError::NoProject)?;
        let start_time = Instant::now();

        let mut jobs = Vec::new();
        for scene in &project.scenes {
            if scene.video.is_none() {
                jobs.push((scene.id.clone(), MediaKind::Video));
            }
            if scene.audio.is_none() {
                jobs.push((scene.id.clone(), MediaKind::Audio));
            }
        }

        info!("🚀 Producing {} tracks across {} scenes", jobs.len(), project.scenes.len());

        let tasks = jobs.into_iter().map(|(scene_id, kind)| {
            let semaphore = Arc::clone(&self.semaphore);
            async move {
                let _permit = semaphore.acquire().await.ok();
                if let Err(e) = self.run_track(&scene_id, kind).await {
                    warn!(scene_id = %scene_id, "Skipped {:?} track: {}", kind, e);
                }
            }
        });
        join_all(tasks).await;

        let summary = self.summary().await?;
        info!(
            "🎉 Production finished in {:.1}s: {}/{} scenes fully ready",
            start_time.elapsed().as_secs_f64(),
            summary.fully_ready,
            summary.total_scenes
        );
        Ok(summary)
    }
}
