use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A source clip available for sequencing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoClip {
    /// Path to the video file
    pub path: PathBuf,

    /// Name/identifier for the clip
    pub name: String,

    /// Playable length in seconds
    pub duration: f64,
}

impl VideoClip {
    pub fn new<P: Into<PathBuf>>(path: P, duration: f64) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("clip")
            .to_string();
        Self { path, name, duration }
    }

    /// Get the file extension
    pub fn extension(&self) -> Option<&str> {
        self.path.extension()?.to_str()
    }

    /// Clips with no playable range cannot contribute to a timeline
    pub fn is_usable(&self) -> bool {
        self.duration.is_finite() && self.duration > 0.0
    }
}

/// The read-only set of clips a sequencer draws from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClipLibrary {
    clips: Vec<VideoClip>,
}

impl ClipLibrary {
    pub fn new(clips: Vec<VideoClip>) -> Self {
        Self { clips }
    }

    pub fn clips(&self) -> &[VideoClip] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Sum of all usable clip durations
    pub fn total_duration(&self) -> f64 {
        self.clips.iter().filter(|c| c.is_usable()).map(|c| c.duration).sum()
    }
}

impl FromIterator<VideoClip> for ClipLibrary {
    fn from_iter<I: IntoIterator<Item = VideoClip>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A trimmed range of one source clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSegment {
    pub source_path: PathBuf,
    pub in_point: f64,
    pub out_point: f64,
}

impl ClipSegment {
    pub fn new<P: AsRef<Path>>(source_path: P, in_point: f64, length: f64) -> Self {
        Self {
            source_path: source_path.as_ref().to_path_buf(),
            in_point,
            out_point: in_point + length,
        }
    }

    pub fn duration(&self) -> f64 {
        self.out_point - self.in_point
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    None,
    Crossfade,
}

/// Join between two consecutive segments
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub kind: TransitionKind,
    /// Overlap of the two segments in seconds (0 for a hard cut)
    pub duration: f64,
}

impl TransitionSpec {
    pub fn cut() -> Self {
        Self {
            kind: TransitionKind::None,
            duration: 0.0,
        }
    }

    /// A crossfade, or a cut when `duration` is not positive
    pub fn crossfade(duration: f64) -> Self {
        if duration > 0.0 {
            Self {
                kind: TransitionKind::Crossfade,
                duration,
            }
        } else {
            Self::cut()
        }
    }
}

/// Ordered segments with the transitions between them
///
/// `transitions[i]` joins `segments[i]` and `segments[i + 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub segments: Vec<ClipSegment>,
    pub transitions: Vec<TransitionSpec>,
}

impl Timeline {
    /// Playback length: segment time minus the overlap consumed by transitions
    pub fn duration(&self) -> f64 {
        let segments: f64 = self.segments.iter().map(|s| s.duration()).sum();
        let overlap: f64 = self.transitions.iter().map(|t| t.duration).sum();
        segments - overlap
    }

    /// Timeline time at which each segment starts
    pub fn segment_offsets(&self) -> Vec<f64> {
        let mut offsets = Vec::with_capacity(self.segments.len());
        let mut cursor = 0.0;

        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                cursor -= self.transitions.get(i - 1).map(|t| t.duration).unwrap_or(0.0);
            }
            offsets.push(cursor);
            cursor += segment.duration();
        }

        offsets
    }

    pub fn has_crossfades(&self) -> bool {
        self.transitions.iter().any(|t| t.kind == TransitionKind::Crossfade)
    }
}

/// Output video parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoParams {
    /// Target frame rate for output
    pub fps: f64,

    /// Target resolution (width, height)
    pub resolution: (u32, u32),

    /// Video codec to use for output
    pub codec: String,

    /// Quality setting (0-100, higher is better)
    pub quality: u8,

    /// Encoder speed preset
    pub preset: String,

    pub pixel_format: String,

    pub audio_codec: String,

    pub audio_bitrate: String,

    pub sample_rate: u32,

    pub channels: u16,
}

impl Default for VideoParams {
    fn default() -> Self {
        Self {
            fps: 30.0,
            resolution: (1080, 1920),
            codec: "libx264".to_string(),
            quality: 55,
            preset: "medium".to_string(),
            pixel_format: "yuv420p".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
            sample_rate: 48_000,
            channels: 2,
        }
    }
}

impl VideoParams {
    /// Constant rate factor for the quality setting (lower is better)
    pub fn crf(&self) -> u8 {
        (51 - ((self.quality.min(100) as f32 / 100.0) * 51.0) as u8).clamp(0, 51)
    }

    /// Duration of one output frame in seconds
    pub fn frame_interval(&self) -> f64 {
        1.0 / self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_duration_subtracts_overlap() {
        let timeline = Timeline {
            segments: vec![
                ClipSegment::new("a.mp4", 0.0, 3.0),
                ClipSegment::new("b.mp4", 1.0, 3.0),
                ClipSegment::new("c.mp4", 0.5, 2.0),
            ],
            transitions: vec![TransitionSpec::crossfade(0.5), TransitionSpec::cut()],
        };

        assert!((timeline.duration() - 7.5).abs() < 1e-9);
        assert_eq!(timeline.segment_offsets(), vec![0.0, 2.5, 5.5]);
        assert!(timeline.has_crossfades());
    }

    #[test]
    fn test_crossfade_of_zero_is_a_cut() {
        assert_eq!(TransitionSpec::crossfade(0.0).kind, TransitionKind::None);
    }

    #[test]
    fn test_quality_to_crf() {
        let mut params = VideoParams::default();
        assert_eq!(params.crf(), 23);
        params.quality = 100;
        assert_eq!(params.crf(), 0);
        params.quality = 0;
        assert_eq!(params.crf(), 51);
    }

    #[test]
    fn test_clip_name_from_path() {
        let clip = VideoClip::new("/clips/beach_day.mp4", 4.0);
        assert_eq!(clip.name, "beach_day");
        assert_eq!(clip.extension(), Some("mp4"));
        assert!(clip.is_usable());
        assert!(!VideoClip::new("x.mp4", 0.0).is_usable());
    }
}
