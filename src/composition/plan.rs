use chrono::Utc;
use serde::Serialize;

use crate::{
    audio::{MixPlan, TrackKind},
    error::PlanValidationError,
    subtitles::SubtitleArtifact,
    video::{Timeline, VideoParams},
};

const EPSILON: f64 = 1e-9;

/// Everything the media backend needs for one composition
#[derive(Debug, Clone, Serialize)]
pub struct CompositionPlan {
    pub job_id: String,
    /// RFC 3339 creation time
    pub created_at: String,
    pub video: VideoParams,
    pub timeline: Timeline,
    pub mix: MixPlan,
    pub subtitles: Option<SubtitleArtifact>,
    pub voiceover_duration: f64,
    /// Allowed timeline/voiceover drift before validation fails
    pub tolerance: f64,
    /// Seed the clip sequence was drawn with
    pub seed: u64,
}

impl CompositionPlan {
    pub fn new(
        video: VideoParams,
        timeline: Timeline,
        mix: MixPlan,
        subtitles: Option<SubtitleArtifact>,
        voiceover_duration: f64,
        tolerance: f64,
        seed: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            job_id: format!("job-{}-{:016x}", now.format("%Y%m%dT%H%M%S"), seed),
            created_at: now.to_rfc3339(),
            video,
            timeline,
            mix,
            subtitles,
            voiceover_duration,
            tolerance,
            seed,
        }
    }

    /// Length handed to the encoder
    pub fn output_duration(&self) -> f64 {
        self.timeline.duration().min(self.mix.timeline_duration)
    }

    /// Cross-component checks, run before anything is sent to a backend
    pub fn validate(&self) -> Result<(), PlanValidationError> {
        let timeline = self.timeline.duration();
        let tolerance = self.tolerance.max(self.video.frame_interval());

        if (timeline - self.voiceover_duration).abs() > tolerance + EPSILON {
            return Err(PlanValidationError::DurationMismatch {
                timeline,
                voiceover: self.voiceover_duration,
                tolerance,
            });
        }

        let segments = self.timeline.segments.len();
        let transitions = self.timeline.transitions.len();
        if segments == 0 || transitions + 1 != segments {
            return Err(PlanValidationError::TimelineShape { segments, transitions });
        }

        for (index, transition) in self.timeline.transitions.iter().enumerate() {
            let shorter = self.timeline.segments[index]
                .duration()
                .min(self.timeline.segments[index + 1].duration());
            if transition.duration > shorter / 2.0 + EPSILON {
                return Err(PlanValidationError::TransitionTooLong {
                    index,
                    duration: transition.duration,
                });
            }
        }

        if let Some(artifact) = &self.subtitles {
            // the final cue may round up by one tick of the format's clock
            if artifact.last_cue_end > timeline + artifact.resolution() + EPSILON {
                return Err(PlanValidationError::SubtitlesOverrun {
                    cue_end: artifact.last_cue_end,
                    timeline,
                });
            }
        }

        let voiceover = self.mix.count(TrackKind::Voiceover);
        if voiceover != 1 {
            return Err(PlanValidationError::TrackCount {
                track: TrackKind::Voiceover.to_string(),
                count: voiceover,
            });
        }
        for kind in [TrackKind::Bgm, TrackKind::Cta] {
            let count = self.mix.count(kind);
            if count > 1 {
                return Err(PlanValidationError::TrackCount {
                    track: kind.to_string(),
                    count,
                });
            }
        }

        Ok(())
    }
}
