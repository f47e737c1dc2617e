use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::media::{MediaHandle, MediaKind};
use crate::{Result, StudioError};

/// Maximum number of pitch characters kept in a project title
const TITLE_MAX_CHARS: usize = 30;

/// Narrator of a scene
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Speaker {
    Joe,
    Jane,
}

impl Speaker {
    /// Prebuilt voice used by the speech backend for this speaker
    pub fn voice_name(&self) -> &'static str {
        match self {
            Speaker::Joe => "Kore",
            Speaker::Jane => "Puck",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::Joe => write!(f, "Joe"),
            Speaker::Jane => write!(f, "Jane"),
        }
    }
}

/// Generation status of a scene
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SceneStatus {
    Pending,
    GeneratingVideo,
    GeneratingAudio,
    Completed,
    Error,
}

impl SceneStatus {
    /// `Completed` and `Error` only change on an explicit re-trigger
    pub fn is_terminal(&self) -> bool {
        matches!(self, SceneStatus::Completed | SceneStatus::Error)
    }

    pub fn is_generating(&self) -> bool {
        matches!(self, SceneStatus::GeneratingVideo | SceneStatus::GeneratingAudio)
    }
}

impl fmt::Display for SceneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SceneStatus::Pending => "pending",
            SceneStatus::GeneratingVideo => "generating video",
            SceneStatus::GeneratingAudio => "generating audio",
            SceneStatus::Completed => "completed",
            SceneStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// One unit of the generated movie
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scene {
    pub id: String,
    pub title: String,
    pub visual_prompt: String,
    pub audio_script: String,
    pub speaker: Speaker,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<MediaHandle>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<MediaHandle>,

    pub status: SceneStatus,

    /// 0.0 while a track is generating, 1.0 once it succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,

    /// Message of the most recent failed action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Scene {
    /// Fresh pending scene with a newly generated identifier
    pub fn new(title: String, visual_prompt: String, audio_script: String, speaker: Speaker) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            visual_prompt,
            audio_script,
            speaker,
            video: None,
            audio: None,
            status: SceneStatus::Pending,
            progress: None,
            last_error: None,
        }
    }

    /// Both the video and the narration clip are present
    pub fn is_fully_ready(&self) -> bool {
        self.video.is_some() && self.audio.is_some()
    }

    pub fn handle(&self, kind: MediaKind) -> Option<&MediaHandle> {
        match kind {
            MediaKind::Video => self.video.as_ref(),
            MediaKind::Audio => self.audio.as_ref(),
        }
    }

    /// Copy of this scene marked as generating the given track
    pub fn start_generating(&self, kind: MediaKind) -> Self {
        Self {
            status: match kind {
                MediaKind::Video => SceneStatus::GeneratingVideo,
                MediaKind::Audio => SceneStatus::GeneratingAudio,
            },
            progress: Some(0.0),
            last_error: None,
            ..self.clone()
        }
    }

    /// Copy of this scene with the track's handle attached and status completed
    pub fn complete_with(&self, handle: MediaHandle) -> Self {
        let mut next = Self {
            status: SceneStatus::Completed,
            progress: Some(1.0),
            last_error: None,
            ..self.clone()
        };
        match handle.kind {
            MediaKind::Video => next.video = Some(handle),
            MediaKind::Audio => next.audio = Some(handle),
        }
        next
    }

    /// Copy of this scene in error status; handles are left untouched
    pub fn fail_with(&self, message: impl Into<String>) -> Self {
        Self {
            status: SceneStatus::Error,
            progress: None,
            last_error: Some(message.into()),
            ..self.clone()
        }
    }
}

/// A movie production created from a single pitch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub scenes: Vec<Scene>,
}

impl Project {
    pub fn new(pitch: &str, scenes: Vec<Scene>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: derive_title(pitch),
            description: pitch.to_string(),
            created_at: Utc::now(),
            scenes,
        }
    }

    pub fn scene(&self, scene_id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.id == scene_id)
    }

    /// Every scene has both clips, so the whole movie can be screened
    pub fn is_fully_ready(&self) -> bool {
        !self.scenes.is_empty() && self.scenes.iter().all(Scene::is_fully_ready)
    }

    /// Scenes holding both clips, in project order
    pub fn ready_scenes(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.iter().filter(|s| s.is_fully_ready())
    }

    /// New project value with the scene of the same id replaced
    fn with_scene(&self, updated: Scene) -> Self {
        let scenes = self
            .scenes
            .iter()
            .map(|s| if s.id == updated.id { updated.clone() } else { s.clone() })
            .collect();

        Self {
            scenes,
            ..self.clone()
        }
    }
}

/// Title shown for a project: the first characters of the pitch, as typed
pub fn derive_title(pitch: &str) -> String {
    if pitch.chars().count() > TITLE_MAX_CHARS {
        let head: String = pitch.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}...", head)
    } else {
        pitch.to_string()
    }
}

/// In-memory store for the active project.
///
/// Readers get `Arc<Project>` snapshots; every update publishes a new project
/// value, so a snapshot never changes under its holder.
#[derive(Debug, Clone, Default)]
pub struct ProjectStore {
    current: Arc<RwLock<Option<Arc<Project>>>>,
}

impl ProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new project and hand back the one it replaced
    pub async fn replace_project(&self, project: Project) -> (Arc<Project>, Option<Arc<Project>>) {
        let project = Arc::new(project);
        let previous = self.current.write().await.replace(Arc::clone(&project));

        info!(
            "🎬 Project '{}' ready with {} scenes",
            project.title,
            project.scenes.len()
        );
        (project, previous)
    }

    pub async fn snapshot(&self) -> Option<Arc<Project>> {
        self.current.read().await.clone()
    }

    pub async fn scene(&self, scene_id: &str) -> Result<Scene> {
        let guard = self.current.read().await;
        let project = guard.as_ref().ok_or(StudioError::NoProject)?;
        project
            .scene(scene_id)
            .cloned()
            .ok_or_else(|| StudioError::SceneNotFound(scene_id.to_string()))
    }

    /// Replace a scene by id with the value computed from its current state.
    ///
    /// The read-modify-write happens under the write lock, so concurrent
    /// updates to the same scene never overwrite each other.
    pub async fn update_scene<F>(&self, scene_id: &str, update: F) -> Result<Scene>
    where
        F: FnOnce(&Scene) -> Scene,
    {
        let mut guard = self.current.write().await;
        let project = guard.as_ref().ok_or(StudioError::NoProject)?;
        let current = project
            .scene(scene_id)
            .ok_or_else(|| StudioError::SceneNotFound(scene_id.to_string()))?;

        let mut updated = update(current);
        updated.id = current.id.clone();

        let next = Arc::new(project.with_scene(updated.clone()));
        *guard = Some(next);

        debug!(scene_id = %scene_id, status = %updated.status, "Scene updated");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(title: &str) -> Scene {
        Scene::new(
            title.to_string(),
            "A neon city at night".to_string(),
            "It begins.".to_string(),
            Speaker::Jane,
        )
    }

    fn handle(kind: MediaKind) -> MediaHandle {
        MediaHandle {
            id: Uuid::new_v4(),
            kind,
            byte_len: 4,
        }
    }

    #[test]
    fn test_title_truncation() {
        assert_eq!(derive_title("Short pitch"), "Short pitch");

        let exact = "a".repeat(30);
        assert_eq!(derive_title(&exact), exact);

        let long = "A cyberpunk detective walking through a neon-lit rainstorm";
        assert_eq!(derive_title(long), "A cyberpunk detective walking ...");

        let wide = "é".repeat(31);
        assert_eq!(derive_title(&wide), format!("{}...", "é".repeat(30)));

        // Leading whitespace counts towards the limit
        let padded = format!("  {}", "b".repeat(29));
        assert_eq!(derive_title(&padded), format!("  {}...", "b".repeat(28)));
    }

    #[test]
    fn test_scene_transitions() {
        let pending = scene("Opening");
        assert_eq!(pending.status, SceneStatus::Pending);

        let generating = pending.start_generating(MediaKind::Video);
        assert_eq!(generating.status, SceneStatus::GeneratingVideo);
        assert_eq!(generating.progress, Some(0.0));

        let done = generating.complete_with(handle(MediaKind::Video));
        assert_eq!(done.status, SceneStatus::Completed);
        assert!(done.video.is_some());
        assert!(done.audio.is_none());
        assert!(!done.is_fully_ready());

        let failed = done.start_generating(MediaKind::Audio).fail_with("boom");
        assert_eq!(failed.status, SceneStatus::Error);
        assert!(failed.video.is_some());
        assert_eq!(failed.last_error.as_deref(), Some("boom"));
        assert!(failed.status.is_terminal());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&SceneStatus::GeneratingVideo).unwrap();
        assert_eq!(json, "\"generating-video\"");
        assert_eq!(SceneStatus::GeneratingAudio.to_string(), "generating audio");
    }

    #[test]
    fn test_readiness_requires_every_scene() {
        let ready = scene("One")
            .complete_with(handle(MediaKind::Video))
            .complete_with(handle(MediaKind::Audio));
        let mut project = Project::new("pitch", vec![ready.clone(), ready.clone()]);
        assert!(project.is_fully_ready());

        project.scenes[1].audio = None;
        assert!(!project.is_fully_ready());
        assert_eq!(project.ready_scenes().count(), 1);

        project.scenes[1] = ready;
        project.scenes[0].video = None;
        assert!(!project.is_fully_ready());

        assert!(!Project::new("empty", Vec::new()).is_fully_ready());
    }

    #[tokio::test]
    async fn test_update_without_project_fails() {
        let store = ProjectStore::new();
        let result = store.update_scene("missing", |s| s.clone()).await;
        assert!(matches!(result, Err(StudioError::NoProject)));
    }

    #[tokio::test]
    async fn test_update_replaces_by_identity() {
        let store = ProjectStore::new();
        let scenes = vec![scene("One"), scene("Two"), scene("Three")];
        let target = scenes[1].id.clone();
        let (before, previous) = store.replace_project(Project::new("pitch", scenes)).await;
        assert!(previous.is_none());

        let updated = store
            .update_scene(&target, |s| s.start_generating(MediaKind::Audio))
            .await
            .unwrap();
        assert_eq!(updated.status, SceneStatus::GeneratingAudio);

        let after = store.snapshot().await.unwrap();
        assert_eq!(after.id, before.id);
        assert_eq!(after.scenes[1].status, SceneStatus::GeneratingAudio);
        assert_eq!(after.scenes[0], before.scenes[0]);
        assert_eq!(after.scenes[2], before.scenes[2]);

        // The old snapshot is untouched
        assert_eq!(before.scenes[1].status, SceneStatus::Pending);

        let missing = store.update_scene("nope", |s| s.clone()).await;
        assert!(matches!(missing, Err(StudioError::SceneNotFound(_))));
    }

    #[tokio::test]
    async fn test_replace_returns_previous_project() {
        let store = ProjectStore::new();
        let (first, _) = store.replace_project(Project::new("first", vec![scene("A")])).await;
        let (second, previous) = store.replace_project(Project::new("second", vec![scene("B")])).await;

        assert_eq!(previous.map(|p| p.id.clone()), Some(first.id.clone()));
        assert_eq!(store.snapshot().await.unwrap().id, second.id);
        assert!(store.scene(&first.scenes[0].id).await.is_err());
    }
}
