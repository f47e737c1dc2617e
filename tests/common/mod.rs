#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use cinenode_studio::audio;
use cinenode_studio::generation::{
    GenerationClient, GenerativeBackend, ScriptRequest, SpeechRequest, VideoJob, VideoRequest,
};
use cinenode_studio::{ConfigBuilder, HostCapabilities, MediaLibrary, ProductionOrchestrator, Result, StudioError};

pub const VIDEO_URI: &str = "https://media.example.test/files/clip:download?alt=media";
pub const VIDEO_BYTES: &[u8] = b"\x00\x00\x00\x18ftypmp42fake-video";

pub fn script_json(titles: &[&str]) -> String {
    let scenes: Vec<String> = titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            let speaker = if i % 2 == 0 { "Joe" } else { "Jane" };
            format!(
                r#"{{"title":"{t}","visualPrompt":"Render of {t}","audioScript":"Narration for {t}","speaker":"{s}"}}"#,
                t = title,
                s = speaker
            )
        })
        .collect();
    format!("[{}]", scenes.join(","))
}

pub fn pcm_samples() -> Vec<i16> {
    (0..240).map(|i| ((i as i16) - 120) * 200).collect()
}

pub fn pcm_base64() -> String {
    let bytes: Vec<u8> = pcm_samples().iter().flat_map(|s| s.to_le_bytes()).collect();
    audio::encode_base64(&bytes)
}

pub fn running_job(name: &str) -> VideoJob {
    VideoJob {
        name: name.to_string(),
        done: false,
        video_uri: None,
        error: None,
    }
}

pub fn finished_job(name: &str, uri: Option<&str>) -> VideoJob {
    VideoJob {
        name: name.to_string(),
        done: true,
        video_uri: uri.map(str::to_string),
        error: None,
    }
}

fn unavailable(what: &str) -> StudioError {
    StudioError::Api {
        status: 503,
        message: format!("{} backend unavailable", what),
    }
}

/// Scripted in-memory backend.
///
/// Video jobs are served from a queue: the first entry answers the
/// submission, each later entry answers one poll. Once the queue is empty a
/// finished job with [`VIDEO_URI`] is returned, unless `never_finish` is set.
pub struct MockBackend {
    script: Mutex<std::result::Result<String, String>>,
    video_jobs: Mutex<VecDeque<VideoJob>>,
    never_finish: bool,
    video_failures: AtomicUsize,
    video_gate: Option<Arc<Semaphore>>,
    speech: Mutex<Option<String>>,
    speech_failures: AtomicUsize,

    pub script_requests: Mutex<Vec<ScriptRequest>>,
    pub video_requests: Mutex<Vec<VideoRequest>>,
    pub speech_requests: Mutex<Vec<SpeechRequest>>,
    pub submits: AtomicUsize,
    pub polls: AtomicUsize,
    pub downloads: AtomicUsize,
    /// Highest number of submission and speech calls running at once
    pub peak_in_flight: AtomicUsize,
    in_flight: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Ok(script_json(&["Awakening", "The Chase", "Dawn"]))),
            video_jobs: Mutex::new(VecDeque::new()),
            never_finish: false,
            video_failures: AtomicUsize::new(0),
            video_gate: None,
            speech: Mutex::new(Some(pcm_base64())),
            speech_failures: AtomicUsize::new(0),
            script_requests: Mutex::new(Vec::new()),
            video_requests: Mutex::new(Vec::new()),
            speech_requests: Mutex::new(Vec::new()),
            submits: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_script(self, content: String) -> Self {
        *self.script.lock().unwrap() = Ok(content);
        self
    }

    pub fn with_script_failure(self, message: &str) -> Self {
        *self.script.lock().unwrap() = Err(message.to_string());
        self
    }

    pub fn with_video_jobs(self, jobs: Vec<VideoJob>) -> Self {
        *self.video_jobs.lock().unwrap() = jobs.into();
        self
    }

    pub fn with_never_finishing_video(mut self) -> Self {
        self.never_finish = true;
        self
    }

    pub fn with_video_failures(self, count: usize) -> Self {
        self.video_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Hold every video submission until a permit is added to the gate
    pub fn with_video_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.video_gate = Some(gate);
        self
    }

    pub fn with_speech(self, payload: Option<String>) -> Self {
        *self.speech.lock().unwrap() = payload;
        self
    }

    pub fn with_speech_failures(self, count: usize) -> Self {
        self.speech_failures.store(count, Ordering::SeqCst);
        self
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn next_job(&self, name: &str) -> VideoJob {
        match self.video_jobs.lock().unwrap().pop_front() {
            Some(job) => job,
            None if self.never_finish => running_job(name),
            None => finished_job(name, Some(VIDEO_URI)),
        }
    }
}

#[async_trait]
impl GenerativeBackend for MockBackend {
    async fn generate_script(&self, request: &ScriptRequest) -> Result<String> {
        self.script_requests.lock().unwrap().push(request.clone());
        self.script.lock().unwrap().clone().map_err(|m| StudioError::Api {
            status: 500,
            message: m,
        })
    }

    async fn submit_video(&self, request: &VideoRequest) -> Result<VideoJob> {
        self.video_requests.lock().unwrap().push(request.clone());
        self.submits.fetch_add(1, Ordering::SeqCst);
        self.enter();

        if let Some(gate) = &self.video_gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        let result = if Self::take_failure(&self.video_failures) {
            Err(unavailable("video"))
        } else {
            Ok(self.next_job("operations/mock-video"))
        };

        self.leave();
        result
    }

    async fn poll_video(&self, job: &VideoJob) -> Result<VideoJob> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(self.next_job(&job.name))
    }

    async fn download_video(&self, uri: &str) -> Result<Vec<u8>> {
        assert_eq!(uri, VIDEO_URI);
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(VIDEO_BYTES.to_vec())
    }

    async fn synthesize_speech(&self, request: &SpeechRequest) -> Result<Option<String>> {
        self.speech_requests.lock().unwrap().push(request.clone());
        self.enter();

        let result = if Self::take_failure(&self.speech_failures) {
            Err(unavailable("speech"))
        } else {
            Ok(self.speech.lock().unwrap().clone())
        };

        self.leave();
        result
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

pub fn client_with(backend: Arc<MockBackend>, poll_timeout: Option<u64>) -> GenerationClient {
    let config = ConfigBuilder::new()
        .with_api_key("test-key".to_string())
        .with_poll_interval(10)
        .with_poll_timeout(poll_timeout)
        .build();

    GenerationClient::new(backend, MediaLibrary::new(), config.video)
}

pub fn orchestrator_with(backend: Arc<MockBackend>) -> ProductionOrchestrator {
    orchestrator_limited(backend, Some(600), 4)
}

pub fn orchestrator_limited(
    backend: Arc<MockBackend>,
    poll_timeout: Option<u64>,
    max_concurrent: usize,
) -> ProductionOrchestrator {
    ProductionOrchestrator::new(
        client_with(backend, poll_timeout),
        HostCapabilities { key_selected: true },
        max_concurrent,
    )
}
