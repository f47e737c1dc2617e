use anyhow::{anyhow, Result};
use clap::{Arg, Command};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cinenode_studio::audio;
use cinenode_studio::generation::{create_backend, GenerationClient};
use cinenode_studio::{
    Config, HostCapabilities, MediaLibrary, PlaybackEvent, PlaybackSequencer,
    ProductionOrchestrator, ProjectExporter,
};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("CineNode Studio")
        .version("0.1.0")
        .author("TigreRoll")
        .about("Turn a movie pitch into generated scenes with video and narration")
        .arg(
            Arg::new("pitch")
                .value_name("PITCH")
                .help("One-line movie pitch")
                .required(true)
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to a cinenode.toml configuration file")
        )
        .arg(
            Arg::new("api-key")
                .short('k')
                .long("api-key")
                .value_name("KEY")
                .help("API key for the generative backend")
        )
        .arg(
            Arg::new("export-dir")
                .short('o')
                .long("export-dir")
                .value_name("DIR")
                .help("Export clips and a manifest to this directory")
        )
        .arg(
            Arg::new("script-only")
                .long("script-only")
                .help("Only write the script, skip video and narration")
                .action(clap::ArgAction::SetTrue)
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue)
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");

    // Load configuration
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::load_from(&PathBuf::from(path))?,
        None => Config::load().unwrap_or_else(|e| {
            eprintln!("Failed to load config, using defaults: {}", e);
            Config::default()
        }),
    };

    // Initialize logging
    let default_filter = if verbose {
        "cinenode_studio=debug,cinenode=debug,warn".to_string()
    } else {
        format!("cinenode_studio={0},cinenode={0},warn", config.output.log_level)
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    if let Some(key) = matches.get_one::<String>("api-key") {
        config.generation.api_key = Some(key.clone());
    }
    if let Some(dir) = matches.get_one::<String>("export-dir") {
        config.production.export_dir = Some(PathBuf::from(dir));
    }
    config.validate()?;

    let capabilities = HostCapabilities::resolve(&config);
    if !capabilities.key_selected {
        error!("No API key selected. Pass --api-key, set GEMINI_API_KEY, or add generation.api_key to cinenode.toml");
        return Err(anyhow!("API key required"));
    }

    info!("🎬 CineNode Studio starting...");
    if verbose {
        info!("{}", config.summary());
    }

    let backend = create_backend(&config.generation)?;
    let client = GenerationClient::new(backend, MediaLibrary::new(), config.video.clone());
    info!("🤖 Using {} backend", client.provider_name());
    let orchestrator = ProductionOrchestrator::new(
        client,
        capabilities,
        config.production.max_concurrent_generations,
    );

    let pitch = matches
        .get_one::<String>("pitch")
        .ok_or_else(|| anyhow!("pitch is required"))?;

    let project = orchestrator.start_project(pitch).await?;
    info!("📽️ Project: {} ({})", project.title, project.id);
    for (index, scene) in project.scenes.iter().enumerate() {
        info!("  SCENE {} - {} [{}]", index + 1, scene.title, scene.speaker);
    }

    if matches.get_flag("script-only") {
        return Ok(());
    }

    let summary = orchestrator.produce_all().await?;
    info!("📊 Total scenes: {}", summary.total_scenes);
    info!("🎞️ Visuals ready: {}", summary.visuals_ready);
    info!("🎙️ Audio ready: {}", summary.audio_ready);

    let project = orchestrator
        .project()
        .await
        .ok_or_else(|| anyhow!("project disappeared from the store"))?;

    for scene in project.scenes.iter().filter(|s| s.last_error.is_some()) {
        warn!(
            "Scene '{}' needs attention: {}",
            scene.title,
            scene.last_error.as_deref().unwrap_or_default()
        );
    }

    if !summary.is_ready() {
        warn!("Some scenes failed; the movie was not screened or exported");
        return Ok(());
    }

    // Walk the screening order the way the player would
    let mut sequencer = PlaybackSequencer::new();
    let mut cue = sequencer.start(&project)?;
    loop {
        let narration = audio::wav_duration(audio::wav_sample_count(cue.audio.byte_len));
        info!(
            "▶️ {}. {} | video {} | narration {:.1}s",
            cue.index + 1,
            cue.title,
            cue.video.uri(),
            narration.as_secs_f64()
        );

        match sequencer.on_track_finished() {
            PlaybackEvent::Advanced(next) => cue = next,
            PlaybackEvent::Finished => break,
        }
    }

    if let Some(dir) = &config.production.export_dir {
        let exporter = ProjectExporter::new(orchestrator.media().clone());
        let manifest = exporter.export(&project, dir).await?;
        info!("📂 {} scenes exported to {}", manifest.scenes.len(), dir.display());
    }

    Ok(())
}
