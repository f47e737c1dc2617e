use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::media::{MediaHandle, MediaLibrary};
use crate::state::{Project, Speaker};
use crate::{Result, StudioError};

/// Readiness counts shown before screening
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionSummary {
    pub total_scenes: usize,
    pub visuals_ready: usize,
    pub audio_ready: usize,
    pub fully_ready: usize,
}

impl ProductionSummary {
    pub fn of(project: &Project) -> Self {
        Self {
            total_scenes: project.scenes.len(),
            visuals_ready: project.scenes.iter().filter(|s| s.video.is_some()).count(),
            audio_ready: project.scenes.iter().filter(|s| s.audio.is_some()).count(),
            fully_ready: project.ready_scenes().count(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.total_scenes > 0 && self.fully_ready == self.total_scenes
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportManifest {
    pub project_id: String,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub exported_at: DateTime<Utc>,
    pub scenes: Vec<ExportedScene>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedScene {
    pub index: usize,
    pub title: String,
    pub visual_prompt: String,
    pub audio_script: String,
    pub speaker: Speaker,
    pub video_file: String,
    pub audio_file: String,
}

/// Writes the clips of a fully ready project to disk
pub struct ProjectExporter {
    media: MediaLibrary,
}

impl ProjectExporter {
    pub fn new(media: MediaLibrary) -> Self {
        Self { media }
    }

    /// Export every clip plus a `manifest.json` into `output_dir`
    pub async fn export(&self, project: &Project, output_dir: &Path) -> Result<ExportManifest> {
        if !project.is_fully_ready() {
            let summary = ProductionSummary::of(project);
            return Err(StudioError::NotReady(format!(
                "{} of {} scenes have both clips",
                summary.fully_ready, summary.total_scenes
            )));
        }

        tokio::fs::create_dir_all(output_dir).await?;

        let mut scenes = Vec::with_capacity(project.scenes.len());
        for (index, scene) in project.ready_scenes().enumerate() {
            let stem = format!("scene-{:02}", index + 1);
            let (Some(video), Some(audio)) = (&scene.video, &scene.audio) else {
                continue;
            };

            let video_file = self.write_clip(video, output_dir, &stem).await?;
            let audio_file = self.write_clip(audio, output_dir, &stem).await?;

            scenes.push(ExportedScene {
                index,
                title: scene.title.clone(),
                visual_prompt: scene.visual_prompt.clone(),
                audio_script: scene.audio_script.clone(),
                speaker: scene.speaker,
                video_file,
                audio_file,
            });
        }

        let manifest = ExportManifest {
            project_id: project.id.clone(),
            title: project.title.clone(),
            description: project.description.clone(),
            created_at: project.created_at,
            exported_at: Utc::now(),
            scenes,
        };

        let manifest_path = output_dir.join("manifest.json");
        tokio::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?).await?;

        info!("💾 Exported {} scenes to: {}", manifest.scenes.len(), output_dir.display());
        Ok(manifest)
    }

    async fn write_clip(&self, handle: &MediaHandle, output_dir: &Path, stem: &str) -> Result<String> {
        let bytes = self
            .media
            .resolve(handle)
            .await
            .ok_or_else(|| StudioError::NotReady(format!("{} has been revoked", handle.uri())))?;

        let file_name = format!("{}.{}", stem, handle.kind.extension());
        let path: PathBuf = output_dir.join(&file_name);
        tokio::fs::write(&path, &bytes[..]).await?;
        Ok(file_name)
    }
}
