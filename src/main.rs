use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use shorts_composer::{
    composition::{CompositionDirector, CompositionRequest},
    config::{Config, JobParams},
    error::CompositorError,
    render::Capabilities,
    subtitles::SubtitleFormat,
    transcript::{parse_whisper_json, synthetic_timing, RawTranscript},
};

#[derive(Parser)]
#[command(
    name = "shorts-composer",
    version,
    about = "Assemble short-form vertical videos with mixed audio and word-synchronized subtitles",
    long_about = "Shorts-Composer fills a voiceover's duration with trimmed stock clips, mixes in background music and a call-to-action, and burns in word-timed subtitles."
)]
struct Cli {
    /// Voiceover audio file (WAV, MP3, FLAC, OGG, M4A)
    #[arg(long)]
    voiceover: PathBuf,

    /// Clip files or directories containing clips
    #[arg(long, required = true, num_args = 1..)]
    clips: Vec<PathBuf>,

    /// Output video file path
    #[arg(short, long)]
    output: PathBuf,

    /// Background music, looped and faded to the video length
    #[arg(long)]
    bgm: Option<PathBuf>,

    /// Call-to-action audio, played at the end of the video
    #[arg(long)]
    cta: Option<PathBuf>,

    /// Whisper JSON transcript of the voiceover (defaults to <voiceover>.json)
    #[arg(long)]
    transcript: Option<PathBuf>,

    /// Whisper JSON transcript of the CTA (defaults to <cta>.json)
    #[arg(long)]
    cta_transcript: Option<PathBuf>,

    /// Plain-text script, evenly timed when no transcript words are available
    #[arg(long)]
    script: Option<PathBuf>,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subtitle format (srt, ass)
    #[arg(long)]
    format: Option<SubtitleFormat>,

    /// Renderer to use (ffmpeg, premix)
    #[arg(long)]
    backend: Option<String>,

    /// Seed for clip selection
    #[arg(long)]
    seed: Option<u64>,

    /// Do not burn in subtitles
    #[arg(long)]
    no_subtitles: bool,

    /// Background music gain
    #[arg(long)]
    bgm_volume: Option<f32>,

    /// CTA gain
    #[arg(long)]
    cta_volume: Option<f32>,

    /// Join clips with hard cuts
    #[arg(long)]
    no_transitions: bool,

    /// Crossfade length in seconds
    #[arg(long)]
    transition_duration: Option<f64>,

    /// Maximum words per subtitle cue
    #[arg(long)]
    max_words: Option<usize>,

    /// ASR model identifier
    #[arg(long)]
    model: Option<String>,

    /// Spoken language hint for the recognizer
    #[arg(long)]
    language: Option<String>,

    /// Print the composition plan as JSON instead of rendering
    #[arg(long)]
    plan_only: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn job_params(&self, config: &Config) -> JobParams {
        let mut params = JobParams::from_config(config);
        params.add_subtitles = !self.no_subtitles;
        params.enable_transitions = params.enable_transitions && !self.no_transitions;
        params.seed = self.seed;
        params.language = self.language.clone();
        if let Some(volume) = self.bgm_volume {
            params.bgm_volume = volume;
        }
        if let Some(volume) = self.cta_volume {
            params.cta_volume = volume;
        }
        if let Some(duration) = self.transition_duration {
            params.transition_duration = duration;
        }
        if let Some(words) = self.max_words {
            params.max_words_per_cue = words;
        }
        if let Some(model) = &self.model {
            params.model = model.clone();
        }
        params
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    info!("Starting Shorts-Composer v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<CompositorError>() {
            Some(err) => error!("❌ {}", err.user_message()),
            None => error!("❌ {:#}", e),
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    // Load configuration
    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };
    if let Some(format) = cli.format {
        config.subtitles.format = format;
    }
    if let Some(backend) = &cli.backend {
        config.render.backend = backend.clone();
    }
    config.validate()?;

    let params = cli.job_params(&config);
    params.validate()?;

    let capabilities = Capabilities::detect(&config.render).await;
    let director = CompositionDirector::from_config(config, capabilities)?;
    info!("Using {} renderer", director.renderer_name());

    let library = director.scan_clips(&cli.clips).await?;

    let mut script = match &cli.script {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading script {:?}", path))?,
        ),
        None => None,
    };

    // A script stands in for the transcriber; its words are timed once the duration is known
    // A transcript with text but no word timings is treated the same way
    let voiceover_words = match (&cli.transcript, script.is_some()) {
        (Some(path), has_script) => {
            let transcript = read_transcript(path).await?;
            if transcript.words.is_empty() && !has_script {
                script = Some(transcript.text);
            }
            Some(transcript.words)
        }
        (None, true) => Some(Vec::new()),
        (None, false) => None,
    };
    let cta_transcript = match &cli.cta_transcript {
        Some(path) => Some(read_transcript(path).await?),
        None => None,
    };
    let cta_words = cta_transcript.as_ref().map(|t| t.words.clone());

    let request = CompositionRequest {
        voiceover: cli.voiceover.clone(),
        bgm: cli.bgm.clone(),
        cta: cli.cta.clone(),
        voiceover_words,
        cta_words,
        output: cli.output.clone(),
        params,
    };

    let mut inputs = director.prepare(&request).await?;
    if request.params.add_subtitles && inputs.voiceover_words.is_empty() {
        if let Some(text) = &script {
            warn!("⚠️ No transcript words, timing the script evenly over the voiceover");
            inputs.voiceover_words = synthetic_timing(text, inputs.voiceover.duration);
        }
    }
    if let (Some(transcript), Some(cta)) = (cta_transcript, &inputs.cta) {
        if request.params.add_subtitles && inputs.cta_words.is_empty() {
            inputs.cta_words = transcript.into_timed_words(cta.duration);
        }
    }

    if cli.plan_only {
        let plan = director.plan_blocking(&inputs, &library, &request.params).await?;
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let result = director
        .compose_prepared(&inputs, &library, &request.params, &request.output)
        .await?;

    info!(
        "Composition complete! Output saved to: {:?} ({} warning(s))",
        result.output,
        result.warnings.len()
    );
    Ok(())
}

async fn read_transcript(path: &Path) -> Result<RawTranscript> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading transcript {:?}", path))?;
    Ok(parse_whisper_json(&content)?)
}
