use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, error, info, warn};

use crate::{
    audio::{cta_offset, AudioLoader, AudioMixPlanner, AudioTrack, MixInputs, MixSettings, MixWarning, TrackKind},
    composition::{plan::CompositionPlan, pool::WorkerPool},
    config::{Config, JobParams},
    error::{CompositorError, Result, TimingError},
    render::{Capabilities, RenderOutput, RenderRequest, Renderer, RendererRegistry},
    subtitles::{
        ass::AssStyles, serializer::display_lines, CueSegmenter, LayoutEngine, PlacedCue, SegmenterOptions,
        SubtitleArtifact, SubtitleSerializer, TimestampNormalizer, WordOrigin,
    },
    transcript::{RawWord, Transcriber, TranscriptionRequest, WhisperJsonTranscriber},
    video::{ClipLibrary, ClipScanner, ClipSequencer, SequencerOptions},
};

/// One composition job as submitted by a caller
#[derive(Debug, Clone)]
pub struct CompositionRequest {
    pub voiceover: PathBuf,
    pub bgm: Option<PathBuf>,
    pub cta: Option<PathBuf>,
    /// Recognizer output for the voiceover; transcribed on demand when absent
    pub voiceover_words: Option<Vec<RawWord>>,
    pub cta_words: Option<Vec<RawWord>>,
    pub output: PathBuf,
    pub params: JobParams,
}

/// Probed tracks and word timings, ready for planning
#[derive(Debug, Clone)]
pub struct PreparedInputs {
    pub voiceover: AudioTrack,
    pub bgm: Option<AudioTrack>,
    pub cta: Option<AudioTrack>,
    pub voiceover_words: Vec<RawWord>,
    pub cta_words: Vec<RawWord>,
}

impl PreparedInputs {
    fn mix_inputs(&self) -> MixInputs {
        MixInputs {
            voiceover: self.voiceover.clone(),
            bgm: self.bgm.clone(),
            cta: self.cta.clone(),
        }
    }
}

/// Result of rendering one plan
#[derive(Debug, Clone)]
pub struct RenderSummary {
    pub report: RenderOutput,
    /// Backend invocations, including the successful one
    pub attempts: u32,
}

/// A finished composition
#[derive(Debug, Clone)]
pub struct CompositionOutput {
    pub output: PathBuf,
    pub plan: CompositionPlan,
    pub attempts: u32,
    pub elapsed: Duration,
    pub warnings: Vec<MixWarning>,
}

/// Orchestrates one composition end to end
///
/// The pipeline:
/// 1. Input preparation - probe track durations, obtain word timings
/// 2. Planning - subtitles, clip timeline and audio mix, built in parallel and
///    cross-checked
/// 3. Rendering - hand the validated plan to the media backend, bounded by the
///    worker pool, with one retry on transient backend failures
pub struct CompositionDirector {
    config: Arc<Config>,
    capabilities: Arc<Capabilities>,
    renderer: Arc<dyn Renderer>,
    transcriber: Arc<dyn Transcriber>,
    pool: WorkerPool,
}

impl CompositionDirector {
    pub fn new(config: Config, capabilities: Capabilities, renderer: Arc<dyn Renderer>) -> Self {
        let pool = WorkerPool::new(config.render.max_concurrent_jobs);
        Self {
            config: Arc::new(config),
            capabilities: Arc::new(capabilities),
            renderer,
            transcriber: Arc::new(WhisperJsonTranscriber::new(None)),
            pool,
        }
    }

    /// Director with the renderer named in `config.render.backend`
    pub fn from_config(config: Config, capabilities: Capabilities) -> Result<Self> {
        let renderer = RendererRegistry::new().create(&config.render.backend, &config.render)?;
        Ok(Self::new(config, capabilities, Arc::from(renderer)))
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = transcriber;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn renderer_name(&self) -> &str {
        self.renderer.name()
    }

    /// Main composition method: prepare, plan, render
    pub async fn compose(&self, request: &CompositionRequest, library: &ClipLibrary) -> Result<CompositionOutput> {
        info!("🎬 Starting composition");
        info!("   Voiceover: {:?}", request.voiceover);
        if let Some(bgm) = &request.bgm {
            info!("   BGM: {:?}", bgm);
        }
        if let Some(cta) = &request.cta {
            info!("   CTA: {:?}", cta);
        }
        info!("   Output: {:?}", request.output);
        info!("   Renderer: {}", self.renderer.name());

        // Pipeline Step 1: Inputs
        let inputs = self.prepare(request).await?;

        self.compose_prepared(&inputs, library, &request.params, &request.output)
            .await
    }

    /// Plan and render from inputs that were already prepared
    pub async fn compose_prepared(
        &self,
        inputs: &PreparedInputs,
        library: &ClipLibrary,
        params: &JobParams,
        output: &Path,
    ) -> Result<CompositionOutput> {
        let started = Instant::now();

        // Pipeline Step 2: Planning
        let plan = self.plan_blocking(inputs, library, params).await?;

        // Pipeline Step 3: Rendering
        let summary = self.render_plan(&plan, output).await?;

        let elapsed = started.elapsed();
        info!("🎉 Composition complete! Output saved to: {:?}", output);
        info!("   Attempts: {}, elapsed {:.1}s", summary.attempts, elapsed.as_secs_f64());

        Ok(CompositionOutput {
            output: output.to_path_buf(),
            warnings: plan.mix.warnings.clone(),
            plan,
            attempts: summary.attempts,
            elapsed,
        })
    }

    /// Scan clip files and directories on a blocking thread
    pub async fn scan_clips(&self, paths: &[PathBuf]) -> Result<ClipLibrary> {
        let scanner = ClipScanner::new(self.config.render.ffprobe_path.clone(), &self.config.clips);
        let paths = paths.to_vec();
        tokio::task::spawn_blocking(move || scanner.scan(&paths))
            .await
            .map_err(join_failed)?
    }

    // ==========================================
    // PIPELINE STEP 1: INPUTS
    // ==========================================

    /// Probe every track and obtain word timings
    pub async fn prepare(&self, request: &CompositionRequest) -> Result<PreparedInputs> {
        info!("🎙️ Step 1: Preparing inputs");

        let voiceover = self.probe_track(TrackKind::Voiceover, &request.voiceover).await?;
        let bgm = match &request.bgm {
            Some(path) => Some(self.probe_track(TrackKind::Bgm, path).await?),
            None => None,
        };
        let cta = match &request.cta {
            Some(path) => Some(self.probe_track(TrackKind::Cta, path).await?),
            None => None,
        };

        let params = &request.params;
        let (voiceover_words, cta_words) = if params.add_subtitles {
            let voiceover_words = match &request.voiceover_words {
                Some(words) => words.clone(),
                None => self.transcribe(&voiceover, params).await?,
            };

            let cta_words = match (&request.cta_words, &cta) {
                (Some(words), _) => words.clone(),
                (None, Some(track)) => match self.transcribe(track, params).await {
                    Ok(words) => words,
                    Err(e) => {
                        warn!("⚠️ CTA transcript unavailable, CTA will have no captions: {}", e);
                        Vec::new()
                    }
                },
                (None, None) => Vec::new(),
            };

            (voiceover_words, cta_words)
        } else {
            (Vec::new(), Vec::new())
        };

        info!(
            "   Voiceover {:.2}s, {} words; {} CTA words",
            voiceover.duration,
            voiceover_words.len(),
            cta_words.len()
        );

        Ok(PreparedInputs {
            voiceover,
            bgm,
            cta,
            voiceover_words,
            cta_words,
        })
    }

    async fn probe_track(&self, kind: TrackKind, path: &Path) -> Result<AudioTrack> {
        let owned = path.to_path_buf();
        let probed = tokio::task::spawn_blocking(move || AudioLoader::probe_duration(owned))
            .await
            .map_err(join_failed)?;

        let duration = match probed {
            Ok(duration) => duration,
            Err(e) if self.capabilities.ffprobe => {
                debug!("Decoder could not measure {:?} ({}), asking ffprobe", path, e);
                let scanner = ClipScanner::new(self.config.render.ffprobe_path.clone(), &self.config.clips);
                let owned = path.to_path_buf();
                tokio::task::spawn_blocking(move || scanner.probe_duration(&owned))
                    .await
                    .map_err(join_failed)??
            }
            Err(e) => return Err(e),
        };

        debug!("{} track {:?}: {:.3}s", kind, path, duration);
        Ok(AudioTrack::new(kind, path, duration))
    }

    async fn transcribe(&self, track: &AudioTrack, params: &JobParams) -> Result<Vec<RawWord>> {
        let request = TranscriptionRequest {
            audio: track.path.clone(),
            model: params.model.clone(),
            language: params.language.clone(),
        };
        let transcript = self.transcriber.transcribe(&request).await?;
        if transcript.words.is_empty() && !transcript.text.is_empty() {
            warn!("⚠️ No word timings for {:?}, timing the transcript text evenly", track.path);
        }
        Ok(transcript.into_timed_words(track.duration))
    }

    // ==========================================
    // PIPELINE STEP 2: PLANNING
    // ==========================================

    /// Build and validate the composition plan on the calling thread
    pub fn plan(&self, inputs: &PreparedInputs, library: &ClipLibrary, params: &JobParams) -> Result<CompositionPlan> {
        self.planner().plan(inputs, library, params)
    }

    /// [`plan`](Self::plan) on a blocking thread, off the async runtime
    pub async fn plan_blocking(
        &self,
        inputs: &PreparedInputs,
        library: &ClipLibrary,
        params: &JobParams,
    ) -> Result<CompositionPlan> {
        let planner = self.planner();
        let inputs = inputs.clone();
        let library = library.clone();
        let params = params.clone();
        tokio::task::spawn_blocking(move || planner.plan(&inputs, &library, &params))
            .await
            .map_err(join_failed)?
    }

    fn planner(&self) -> Planner {
        Planner {
            config: self.config.clone(),
            capabilities: self.capabilities.clone(),
        }
    }
}

/// The planning half of the director, detachable onto a blocking thread
#[derive(Clone)]
struct Planner {
    config: Arc<Config>,
    capabilities: Arc<Capabilities>,
}

impl Planner {
    /// The subtitle chain runs in parallel with clip sequencing and mix
    /// planning; all three are reconciled by [`CompositionPlan::validate`].
    fn plan(&self, inputs: &PreparedInputs, library: &ClipLibrary, params: &JobParams) -> Result<CompositionPlan> {
        info!("🧭 Step 2: Planning composition");
        params.validate()?;

        let total = inputs.voiceover.duration;
        if !total.is_finite() || total <= 0.0 {
            return Err(TimingError::InvalidTotalDuration { duration: total }.into());
        }

        let seed = params.seed.unwrap_or_else(rand::random);
        info!("   Duration {:.2}s, clip seed {}", total, seed);

        let mut enable_transitions = params.enable_transitions;
        if enable_transitions && self.capabilities.filter_missing("xfade") {
            warn!("⚠️ ffmpeg has no xfade filter, falling back to hard cuts");
            enable_transitions = false;
        }

        let sequencer = ClipSequencer::new(SequencerOptions {
            clip_duration: self.config.clips.clip_duration,
            enable_transitions,
            transition_duration: params.transition_duration,
        });
        let planner = AudioMixPlanner::new(MixSettings::new(&self.config.audio, params));
        let mix_inputs = inputs.mix_inputs();
        let offset = inputs
            .cta
            .as_ref()
            .map(|cta| cta_offset(total, cta.duration).0)
            .unwrap_or(0.0);

        let (subtitles, (timeline, mix)) = rayon::join(
            || self.build_subtitles(inputs, params, total, offset),
            || {
                rayon::join(
                    || {
                        let mut rng = SmallRng::seed_from_u64(seed);
                        sequencer.sequence(library, total, &mut rng)
                    },
                    || planner.plan(&mix_inputs, total),
                )
            },
        );
        let subtitles = subtitles?;
        let timeline = timeline?;

        let plan = CompositionPlan::new(
            self.config.video.params.clone(),
            timeline,
            mix,
            subtitles,
            total,
            self.config.audio.duration_tolerance,
            seed,
        );

        if let Err(e) = plan.validate() {
            error!("❌ Plan validation failed: {}", e);
            return Err(e.into());
        }

        info!(
            "   Plan {}: {} segments, {} audio tracks, {} cues",
            plan.job_id,
            plan.timeline.segments.len(),
            plan.mix.tracks.len(),
            plan.subtitles.as_ref().map(|s| s.cue_count).unwrap_or(0)
        );
        Ok(plan)
    }

    fn build_subtitles(
        &self,
        inputs: &PreparedInputs,
        params: &JobParams,
        total: f64,
        cta_offset: f64,
    ) -> Result<Option<SubtitleArtifact>> {
        if !params.add_subtitles {
            debug!("Subtitles disabled for this job");
            return Ok(None);
        }

        let config = &self.config.subtitles;
        let (width, height) = self.config.video.params.resolution;

        let voiceover = TimestampNormalizer::new(WordOrigin::Voiceover).normalize(&inputs.voiceover_words, total)?;
        let cta = if inputs.cta_words.is_empty() {
            Vec::new()
        } else {
            let shifted: Vec<RawWord> = inputs
                .cta_words
                .iter()
                .map(|w| RawWord {
                    start: w.start + cta_offset,
                    end: w.end + cta_offset,
                    ..w.clone()
                })
                .collect();
            TimestampNormalizer::new(WordOrigin::Cta).normalize(&shifted, total)?
        };

        let segmenter =
            CueSegmenter::new(SegmenterOptions::from_config(config).with_max_words(params.max_words_per_cue));
        let mut cues = segmenter.segment(&voiceover);
        cues.extend(segmenter.segment(&cta));

        let engine = LayoutEngine::new(self.config.layout.clone());
        let placed = cues
            .into_iter()
            .map(|cue| -> Result<PlacedCue> {
                let lines = display_lines(&cue, config.text_case);
                let layout = engine.layout(width, height, &lines, cue.origin())?;
                Ok(PlacedCue::new(cue, config.text_case, layout))
            })
            .collect::<Result<Vec<_>>>()?;

        let styles = AssStyles {
            voiceover: engine.base_layout(width, height, WordOrigin::Voiceover)?,
            cta: engine.base_layout(width, height, WordOrigin::Cta)?,
        };

        Ok(Some(SubtitleSerializer::new(config.format, config.clone()).serialize(&placed, &styles)))
    }
}

impl CompositionDirector {
    // ==========================================
    // PIPELINE STEP 3: RENDERING
    // ==========================================

    /// Render a plan into `output`
    ///
    /// The backend writes into a temporary file beside `output`, which is
    /// moved into place only on success. Working files are removed whatever
    /// the outcome.
    pub async fn render_plan(&self, plan: &CompositionPlan, output: &Path) -> Result<RenderSummary> {
        info!("🎞️ Step 3: Rendering with {}", self.renderer.name());

        if let Err(e) = plan.validate() {
            error!("❌ Refusing to render an invalid plan: {}", e);
            return Err(e.into());
        }
        self.renderer.check_available(&self.capabilities)?;

        let work_dir = tempfile::Builder::new().prefix("shorts-composer-").tempdir()?;
        let subtitles = match &plan.subtitles {
            Some(artifact) => Some(artifact.write_to(work_dir.path())?),
            None => None,
        };

        let out_dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(out_dir).await?;
        let suffix = output
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let max_attempts = if self.config.render.retry_backend_failures { 2 } else { 1 };
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let temp = tempfile::Builder::new()
                .prefix(".shorts-composer-")
                .suffix(&suffix)
                .tempfile_in(out_dir)?;

            // a retry takes twice the slots so it competes less for CPU
            let result = {
                let _permit = self.pool.acquire(attempts as usize).await?;
                let request = RenderRequest {
                    plan,
                    subtitles: subtitles.as_deref(),
                    work_dir: work_dir.path(),
                    output: temp.path(),
                };
                self.renderer.render(&request).await
            };

            match result {
                Ok(mut report) => {
                    temp.persist(output).map_err(|e| e.error)?;
                    report.path = output.to_path_buf();
                    return Ok(RenderSummary { report, attempts });
                }
                Err(e) if e.is_retryable() && attempts < max_attempts => {
                    warn!("⚠️ Render attempt {} failed, retrying: {}", attempts, e);
                }
                Err(e) => {
                    error!("❌ Render failed after {} attempt(s): {}", attempts, e);
                    return Err(e);
                }
            }
        }
    }
}

fn join_failed(e: tokio::task::JoinError) -> CompositorError {
    CompositorError::generic(format!("blocking task failed: {}", e))
}
