use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::media::MediaHandle;
use crate::state::Project;
use crate::{Result, StudioError};

/// What to put on screen for one scene: both tracks start together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub index: usize,
    pub scene_id: String,
    pub title: String,
    pub video: MediaHandle,
    pub audio: MediaHandle,
}

/// Result of a finished video track
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Playback moved on to the next scene
    Advanced(Cue),
    /// The last scene ended; back to the summary view
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Summary,
    Playing(usize),
}

/// Plays the scenes of a fully ready project back to back
#[derive(Debug, Clone)]
pub struct PlaybackSequencer {
    cues: Vec<Cue>,
    mode: Mode,
}

impl Default for PlaybackSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSequencer {
    pub fn new() -> Self {
        Self {
            cues: Vec::new(),
            mode: Mode::Summary,
        }
    }

    /// Whether the whole project can be screened
    pub fn is_ready(project: &Project) -> bool {
        project.is_fully_ready()
    }

    /// Start screening from the first scene
    pub fn start(&mut self, project: &Project) -> Result<Cue> {
        if !Self::is_ready(project) {
            let ready = project.ready_scenes().count();
            return Err(StudioError::NotReady(format!(
                "{} of {} scenes have both clips",
                ready,
                project.scenes.len()
            )));
        }

        self.cues = project
            .ready_scenes()
            .enumerate()
            .filter_map(|(index, scene)| {
                Some(Cue {
                    index,
                    scene_id: scene.id.clone(),
                    title: scene.title.clone(),
                    video: scene.video.clone()?,
                    audio: scene.audio.clone()?,
                })
            })
            .collect();
        self.mode = Mode::Playing(0);

        info!("▶️ Screening '{}' ({} scenes)", project.title, self.cues.len());
        Ok(self.cues[0].clone())
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.mode, Mode::Playing(_))
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.mode {
            Mode::Playing(index) => Some(index),
            Mode::Summary => None,
        }
    }

    pub fn current(&self) -> Option<&Cue> {
        self.current_index().and_then(|index| self.cues.get(index))
    }

    /// The current scene's video ended naturally
    pub fn on_track_finished(&mut self) -> PlaybackEvent {
        match self.mode {
            Mode::Playing(index) if index + 1 < self.cues.len() => {
                self.mode = Mode::Playing(index + 1);
                debug!("Advancing to scene {}", index + 2);
                PlaybackEvent::Advanced(self.cues[index + 1].clone())
            }
            _ => {
                self.exit();
                PlaybackEvent::Finished
            }
        }
    }

    /// Leave playback and return to the summary view
    pub fn exit(&mut self) {
        if self.is_playing() {
            info!("⏹️ Playback ended");
        }
        self.mode = Mode::Summary;
    }
}
