use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, Result},
    subtitles::{LineMode, SubtitleFormat, TextCase},
    video::VideoParams,
};

/// Main configuration for the Shorts-Composer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cue segmentation and subtitle styling
    pub subtitles: SubtitleConfig,

    /// Subtitle placement on screen
    pub layout: LayoutConfig,

    /// Output video settings
    pub video: VideoConfig,

    /// Clip sequencing settings
    pub clips: ClipConfig,

    /// Audio mix defaults
    pub audio: AudioConfig,

    /// Media backend settings
    pub render: RenderConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.subtitles.validate()?;
        self.layout.validate()?;
        self.video.validate()?;
        self.clips.validate()?;
        self.audio.validate()?;
        self.render.validate()?;
        Ok(())
    }
}

fn invalid<V: ToString>(key: &str, value: V) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Cue segmentation and subtitle style configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleConfig {
    /// Output markup for the subtitle artifact
    pub format: SubtitleFormat,

    /// Maximum words per cue
    pub max_words_per_cue: usize,

    /// Gap between words (seconds) that forces a new cue
    pub pause_threshold: f64,

    /// Maximum characters per cue, spaces included
    pub max_chars_per_cue: usize,

    /// Maximum on-screen duration of one cue (seconds)
    pub max_cue_duration: f64,

    /// How cue text is broken into lines
    pub line_mode: LineMode,

    /// Line length that triggers a break in `wrap` mode
    pub max_line_chars: usize,

    /// Capitalization applied to cue text
    pub text_case: TextCase,

    /// Font family name written into the styled form
    pub font_name: String,

    /// Voiceover text colour (&HAABBGGRR)
    pub primary_colour: String,

    /// CTA text colour (&HAABBGGRR)
    pub cta_colour: String,

    /// Outline colour (&HAABBGGRR)
    pub outline_colour: String,

    /// Shadow/box colour (&HAABBGGRR)
    pub back_colour: String,

    /// Outline width in pixels
    pub outline: f32,

    /// Shadow depth in pixels
    pub shadow: f32,

    /// Render text bold
    pub bold: bool,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            format: SubtitleFormat::Ass,
            max_words_per_cue: 3,
            pause_threshold: 0.3,
            max_chars_per_cue: 45,
            max_cue_duration: 5.0,
            line_mode: LineMode::Wrap,
            max_line_chars: 18,
            text_case: TextCase::Upper,
            font_name: "Arial".to_string(),
            primary_colour: "&H00FFFFFF".to_string(),
            cta_colour: "&H0000FFFF".to_string(),
            outline_colour: "&H00000000".to_string(),
            back_colour: "&H80000000".to_string(),
            outline: 3.0,
            shadow: 0.0,
            bold: true,
        }
    }
}

impl SubtitleConfig {
    fn validate(&self) -> Result<()> {
        if self.max_words_per_cue == 0 {
            return Err(invalid("subtitles.max_words_per_cue", self.max_words_per_cue).into());
        }

        if !(self.pause_threshold.is_finite() && self.pause_threshold >= 0.0) {
            return Err(invalid("subtitles.pause_threshold", self.pause_threshold).into());
        }

        if self.max_chars_per_cue == 0 {
            return Err(invalid("subtitles.max_chars_per_cue", self.max_chars_per_cue).into());
        }

        if !(self.max_cue_duration > 0.0) {
            return Err(invalid("subtitles.max_cue_duration", self.max_cue_duration).into());
        }

        if self.max_line_chars == 0 {
            return Err(invalid("subtitles.max_line_chars", self.max_line_chars).into());
        }

        Ok(())
    }
}

/// Subtitle placement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Starting font size as a fraction of video height
    pub font_height_fraction: f64,

    /// Smallest font size the fitting search may reach
    pub min_font_size: u32,

    /// Font size decrement per search step
    pub font_step: u32,

    /// Widest a line may be, as a fraction of video width
    pub max_width_fraction: f64,

    /// Margin kept clear on every edge, as a fraction of the shorter side
    pub safe_margin_fraction: f64,

    /// Line height as a multiple of font size
    pub line_spacing: f64,

    /// Anchor height for portrait video (fraction of height, lower third)
    pub portrait_offset: f64,

    /// Anchor height for landscape video
    pub landscape_offset: f64,

    /// Anchor height for square video
    pub square_offset: f64,

    /// Multiplier on the approximate glyph advances (wide display fonts > 1.0)
    pub glyph_width_factor: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            font_height_fraction: 0.045,
            min_font_size: 16,
            font_step: 2,
            max_width_fraction: 0.9,
            safe_margin_fraction: 0.04,
            line_spacing: 1.2,
            portrait_offset: 0.78,
            landscape_offset: 0.5,
            square_offset: 0.85,
            glyph_width_factor: 1.0,
        }
    }
}

impl LayoutConfig {
    fn validate(&self) -> Result<()> {
        if !(self.font_height_fraction > 0.0 && self.font_height_fraction < 1.0) {
            return Err(invalid("layout.font_height_fraction", self.font_height_fraction).into());
        }

        if self.min_font_size == 0 {
            return Err(invalid("layout.min_font_size", self.min_font_size).into());
        }

        if self.font_step == 0 {
            return Err(invalid("layout.font_step", self.font_step).into());
        }

        if !(self.max_width_fraction > 0.0 && self.max_width_fraction <= 1.0) {
            return Err(invalid("layout.max_width_fraction", self.max_width_fraction).into());
        }

        if !(0.0..0.5).contains(&self.safe_margin_fraction) {
            return Err(invalid("layout.safe_margin_fraction", self.safe_margin_fraction).into());
        }

        for (key, value) in [
            ("layout.portrait_offset", self.portrait_offset),
            ("layout.landscape_offset", self.landscape_offset),
            ("layout.square_offset", self.square_offset),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(key, value).into());
            }
        }

        if !(self.line_spacing >= 1.0) || !(self.glyph_width_factor > 0.0) {
            return Err(invalid("layout.line_spacing/glyph_width_factor",
                format!("{}/{}", self.line_spacing, self.glyph_width_factor)).into());
        }

        Ok(())
    }
}

/// Output video configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Video encoding parameters
    pub params: VideoParams,
}

impl VideoConfig {
    fn validate(&self) -> Result<()> {
        let (width, height) = self.params.resolution;
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(invalid("video.params.resolution", format!("{}x{}", width, height)).into());
        }

        if !(self.params.fps > 0.0) {
            return Err(invalid("video.params.fps", self.params.fps).into());
        }

        if self.params.quality > 100 {
            return Err(invalid("video.params.quality", self.params.quality).into());
        }

        Ok(())
    }
}

/// Clip sequencing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipConfig {
    /// Fixed length of each selected clip segment (seconds)
    pub clip_duration: f64,

    /// Insert crossfades between segments
    pub enable_transitions: bool,

    /// Crossfade length (seconds)
    pub transition_duration: f64,

    /// Clips shorter than this are left out of the library
    pub min_clip_duration: f64,

    /// File extensions accepted when scanning a clip directory
    pub extensions: Vec<String>,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            clip_duration: 3.0,
            enable_transitions: true,
            transition_duration: 0.5,
            min_clip_duration: 0.5,
            extensions: ["mp4", "mov", "mkv", "avi", "webm", "m4v"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl ClipConfig {
    fn validate(&self) -> Result<()> {
        if !(self.clip_duration > 0.0) {
            return Err(invalid("clips.clip_duration", self.clip_duration).into());
        }

        if self.enable_transitions
            && !(self.transition_duration > 0.0 && self.transition_duration * 2.0 <= self.clip_duration)
        {
            return Err(invalid("clips.transition_duration", self.transition_duration).into());
        }

        if self.min_clip_duration < 0.0 {
            return Err(invalid("clips.min_clip_duration", self.min_clip_duration).into());
        }

        Ok(())
    }
}

/// Audio mix configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Background music gain
    pub bgm_volume: f32,

    /// Call-to-action gain
    pub cta_volume: f32,

    /// BGM fade-in length (seconds)
    pub bgm_fade_in: f64,

    /// BGM fade-out length at the end of the timeline (seconds)
    pub bgm_fade_out: f64,

    /// CTA fade-in length (seconds)
    pub cta_fade_in: f64,

    /// CTA fade-out length (seconds)
    pub cta_fade_out: f64,

    /// Apply a peak limiter after summing the tracks
    pub limiter: bool,

    /// Limiter ceiling (linear amplitude)
    pub limiter_ceiling: f32,

    /// Allowed difference between timeline and voiceover duration (seconds)
    pub duration_tolerance: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            bgm_volume: 0.6,
            cta_volume: 1.5,
            bgm_fade_in: 0.0,
            bgm_fade_out: 1.0,
            cta_fade_in: 0.0,
            cta_fade_out: 0.0,
            limiter: true,
            limiter_ceiling: 0.95,
            duration_tolerance: 0.05,
        }
    }
}

impl AudioConfig {
    fn validate(&self) -> Result<()> {
        if self.bgm_volume < 0.0 || self.cta_volume < 0.0 {
            return Err(invalid("audio.volume", format!("bgm={} cta={}", self.bgm_volume, self.cta_volume)).into());
        }

        for (key, value) in [
            ("audio.bgm_fade_in", self.bgm_fade_in),
            ("audio.bgm_fade_out", self.bgm_fade_out),
            ("audio.cta_fade_in", self.cta_fade_in),
            ("audio.cta_fade_out", self.cta_fade_out),
        ] {
            if !(value >= 0.0) {
                return Err(invalid(key, value).into());
            }
        }

        if !(self.limiter_ceiling > 0.0 && self.limiter_ceiling <= 1.0) {
            return Err(invalid("audio.limiter_ceiling", self.limiter_ceiling).into());
        }

        if !(self.duration_tolerance >= 0.0) {
            return Err(invalid("audio.duration_tolerance", self.duration_tolerance).into());
        }

        Ok(())
    }
}

/// Media backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Renderer name (`ffmpeg` or `premix`)
    pub backend: String,

    /// ffmpeg executable
    pub ffmpeg_path: String,

    /// ffprobe executable
    pub ffprobe_path: String,

    /// Maximum wall time of one backend invocation (seconds)
    pub timeout_secs: u64,

    /// Compositions allowed to render at the same time
    pub max_concurrent_jobs: usize,

    /// Retry once after a backend timeout or failure
    pub retry_backend_failures: bool,

    /// Directory with font files handed to the subtitle filter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fonts_dir: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            backend: "ffmpeg".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            timeout_secs: 900,
            max_concurrent_jobs: num_cpus::get(),
            retry_backend_failures: true,
            fonts_dir: None,
        }
    }
}

impl RenderConfig {
    fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(invalid("render.timeout_secs", self.timeout_secs).into());
        }

        if self.max_concurrent_jobs == 0 {
            return Err(invalid("render.max_concurrent_jobs", self.max_concurrent_jobs).into());
        }

        Ok(())
    }
}

/// Per-request parameters accepted at the request boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobParams {
    pub add_subtitles: bool,
    pub bgm_volume: f32,
    pub cta_volume: f32,
    pub enable_transitions: bool,
    pub transition_duration: f64,
    pub max_words_per_cue: usize,
    /// ASR model identifier handed to the transcription collaborator
    pub model: String,
    pub language: Option<String>,
    /// Seed for clip selection; random when absent
    pub seed: Option<u64>,
}

impl Default for JobParams {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl JobParams {
    /// Request defaults taken from the configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            add_subtitles: true,
            bgm_volume: config.audio.bgm_volume,
            cta_volume: config.audio.cta_volume,
            enable_transitions: config.clips.enable_transitions,
            transition_duration: config.clips.transition_duration,
            max_words_per_cue: config.subtitles.max_words_per_cue,
            model: "base".to_string(),
            language: None,
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.bgm_volume >= 0.0) {
            return Err(invalid("bgm_volume", self.bgm_volume).into());
        }

        if !(self.cta_volume >= 0.0) {
            return Err(invalid("cta_volume", self.cta_volume).into());
        }

        if self.enable_transitions && !(self.transition_duration > 0.0) {
            return Err(invalid("transition_duration", self.transition_duration).into());
        }

        if self.max_words_per_cue == 0 {
            return Err(invalid("max_words_per_cue", self.max_words_per_cue).into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_config.toml");

        let original_config = Config::default();

        original_config.save_to_file(&file_path).unwrap();
        let loaded_config = Config::from_file(&file_path).unwrap();

        assert_eq!(original_config.subtitles.max_words_per_cue, loaded_config.subtitles.max_words_per_cue);
        assert_eq!(original_config.video.params.resolution, loaded_config.video.params.resolution);
        assert_eq!(original_config.render.backend, loaded_config.render.backend);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("[audio]\nbgm_volume = 0.25\n").unwrap();
        assert_eq!(config.audio.bgm_volume, 0.25);
        assert_eq!(config.audio.cta_volume, 1.5);
        assert_eq!(config.subtitles.max_words_per_cue, 3);
    }

    #[test]
    fn test_transition_longer_than_half_clip_rejected() {
        let mut config = Config::default();
        config.clips.clip_duration = 1.0;
        config.clips.transition_duration = 0.6;
        assert!(config.validate().is_err());

        config.clips.enable_transitions = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_job_param_defaults() {
        let params = JobParams::default();
        assert!(params.add_subtitles);
        assert_eq!(params.bgm_volume, 0.6);
        assert_eq!(params.cta_volume, 1.5);
        assert!(params.enable_transitions);
        assert_eq!(params.transition_duration, 0.5);
        assert_eq!(params.max_words_per_cue, 3);
        assert_eq!(params.model, "base");
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_job_params_reject_zero_words() {
        let params = JobParams {
            max_words_per_cue: 0,
            ..JobParams::default()
        };
        assert!(params.validate().is_err());
    }
}
