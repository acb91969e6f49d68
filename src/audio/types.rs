use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Decoded audio, interleaved f32 samples
#[derive(Debug, Clone)]
pub struct AudioData {
    pub samples: Vec<f32>,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Duration in seconds
    pub duration: f64,

    /// Original file path
    pub file_path: PathBuf,
}

impl AudioData {
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        let duration = if sample_rate == 0 {
            0.0
        } else {
            samples.len() as f64 / (sample_rate as f64 * channels as f64)
        };
        Self {
            samples,
            sample_rate,
            channels,
            duration,
            file_path: PathBuf::new(),
        }
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Sample of `channel` at `time`, linearly interpolated; silence outside the data
    ///
    /// A channel beyond the source layout falls back to the last source channel,
    /// so mono sources feed every output channel.
    pub fn sample_at(&self, time: f64, channel: usize) -> f32 {
        if self.sample_rate == 0 || time < 0.0 {
            return 0.0;
        }

        let channels = self.channels.max(1) as usize;
        let channel = channel.min(channels - 1);
        let position = time * self.sample_rate as f64;
        let index = position.floor() as usize;
        let frac = (position - index as f64) as f32;

        let at = |frame: usize| self.samples.get(frame * channels + channel).copied();
        match (at(index), at(index + 1)) {
            (Some(a), Some(b)) => a + (b - a) * frac,
            (Some(a), None) => a,
            _ => 0.0,
        }
    }
}

/// The three tracks a composition can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Voiceover,
    Bgm,
    Cta,
}

impl TrackKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Voiceover => "voiceover",
            Self::Bgm => "bgm",
            Self::Cta => "cta",
        }
    }
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// An input audio file and its probed length
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    pub kind: TrackKind,
    pub path: PathBuf,
    pub duration: f64,
}

impl AudioTrack {
    pub fn new<P: Into<PathBuf>>(kind: TrackKind, path: P, duration: f64) -> Self {
        Self {
            kind,
            path: path.into(),
            duration,
        }
    }
}

/// Gain, placement and envelope of one track on the output timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrackPlan {
    pub track: TrackKind,
    pub source: PathBuf,
    pub gain: f32,
    /// Timeline time at which the track starts
    pub start_offset: f64,
    pub fade_in: f64,
    /// Fade at the end of the played range
    pub fade_out: f64,
    pub source_duration: f64,
    /// Times the source is repeated back to back (1 = no looping)
    pub loop_count: u32,
    /// Length of the track on the timeline, after looping and trimming
    pub play_duration: f64,
}

impl AudioTrackPlan {
    pub fn end(&self) -> f64 {
        self.start_offset + self.play_duration
    }

    /// Envelope gain at `local` seconds into the played range
    pub fn envelope(&self, local: f64) -> f32 {
        if local < 0.0 || local >= self.play_duration {
            return 0.0;
        }

        let mut level = 1.0f64;
        if self.fade_in > 0.0 && local < self.fade_in {
            level = level.min(local / self.fade_in);
        }
        let remaining = self.play_duration - local;
        if self.fade_out > 0.0 && remaining < self.fade_out {
            level = level.min(remaining / self.fade_out);
        }

        self.gain * level as f32
    }
}

/// Peak limiter after the tracks are summed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimiterSpec {
    /// Linear amplitude the output never exceeds
    pub ceiling: f32,
}

/// Non-fatal conditions noticed while planning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MixWarning {
    /// CTA is longer than the video; it starts at 0 and is cut at the end
    CtaLongerThanTimeline { cta: f64, timeline: f64 },
    /// An optional track had no playable audio and was left out
    SilentTrack { track: TrackKind },
}

impl std::fmt::Display for MixWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CtaLongerThanTimeline { cta, timeline } => write!(
                f,
                "CTA ({:.2}s) is longer than the video ({:.2}s); starting it at 0",
                cta, timeline
            ),
            Self::SilentTrack { track } => write!(f, "{} track has no playable audio", track),
        }
    }
}

/// Per-track mix graph for one composition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixPlan {
    pub timeline_duration: f64,
    pub tracks: Vec<AudioTrackPlan>,
    pub limiter: Option<LimiterSpec>,
    pub warnings: Vec<MixWarning>,
}

impl MixPlan {
    pub fn track(&self, kind: TrackKind) -> Option<&AudioTrackPlan> {
        self.tracks.iter().find(|t| t.track == kind)
    }

    pub fn count(&self, kind: TrackKind) -> usize {
        self.tracks.iter().filter(|t| t.track == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(fade_in: f64, fade_out: f64) -> AudioTrackPlan {
        AudioTrackPlan {
            track: TrackKind::Bgm,
            source: PathBuf::from("bgm.mp3"),
            gain: 0.5,
            start_offset: 0.0,
            fade_in,
            fade_out,
            source_duration: 10.0,
            loop_count: 1,
            play_duration: 10.0,
        }
    }

    #[test]
    fn test_envelope_fades() {
        let track = plan(2.0, 1.0);
        assert_eq!(track.envelope(0.0), 0.0);
        assert_eq!(track.envelope(1.0), 0.25);
        assert_eq!(track.envelope(5.0), 0.5);
        assert_eq!(track.envelope(9.5), 0.25);
        assert_eq!(track.envelope(10.0), 0.0);
    }

    #[test]
    fn test_sample_interpolation() {
        let audio = AudioData::from_samples(vec![0.0, 1.0, 0.5], 2, 1);
        assert_eq!(audio.duration, 1.5);
        assert_eq!(audio.sample_at(0.25, 0), 0.5);
        assert_eq!(audio.sample_at(0.5, 1), 1.0);
        assert_eq!(audio.sample_at(5.0, 0), 0.0);
    }
}
