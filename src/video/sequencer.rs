use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use crate::error::ClipLibraryError;
use crate::video::types::{ClipLibrary, ClipSegment, Timeline, TransitionSpec, VideoClip};

/// Guards against libraries of vanishingly short clips
const MAX_SEGMENTS: usize = 10_000;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct SequencerOptions {
    /// Length of each segment before transitions are subtracted
    pub clip_duration: f64,
    pub enable_transitions: bool,
    pub transition_duration: f64,
}

/// Picks and trims source clips until a target duration is filled
///
/// Sources are drawn uniformly without replacement until the library is
/// exhausted, then with replacement. Crossfades overlap adjoining segments, so
/// they consume timeline time rather than adding to it.
pub struct ClipSequencer {
    options: SequencerOptions,
}

impl ClipSequencer {
    pub fn new(options: SequencerOptions) -> Self {
        Self { options }
    }

    pub fn sequence<R: Rng + ?Sized>(
        &self,
        library: &ClipLibrary,
        target: f64,
        rng: &mut R,
    ) -> Result<Timeline, ClipLibraryError> {
        if !target.is_finite() || target < 0.0 {
            return Err(ClipLibraryError::InvalidParameters {
                details: format!("target duration {}", target),
            });
        }
        if !(self.options.clip_duration > 0.0) {
            return Err(ClipLibraryError::InvalidParameters {
                details: format!("clip duration {}", self.options.clip_duration),
            });
        }

        if target <= EPSILON {
            return Ok(Timeline::default());
        }

        let usable: Vec<&VideoClip> = library.clips().iter().filter(|c| c.is_usable()).collect();
        if usable.is_empty() {
            return Err(ClipLibraryError::Insufficient { target });
        }

        let mut pool: Vec<usize> = (0..usable.len()).collect();
        pool.shuffle(rng);

        let mut timeline = Timeline::default();
        let mut cursor = 0.0;
        let mut previous_len: Option<f64> = None;

        loop {
            if timeline.segments.len() >= MAX_SEGMENTS {
                return Err(ClipLibraryError::InvalidParameters {
                    details: format!("more than {} segments needed for {:.2}s", MAX_SEGMENTS, target),
                });
            }

            let source = match pool.pop() {
                Some(index) => usable[index],
                None => usable[rng.gen_range(0..usable.len())],
            };

            let full_len = self.options.clip_duration.min(source.duration);
            let mut transition = match previous_len {
                Some(prev) if self.options.enable_transitions => {
                    self.options.transition_duration.min(prev / 2.0).min(full_len / 2.0).max(0.0)
                }
                _ => 0.0,
            };

            let last = cursor - transition + full_len >= target - EPSILON;
            let len = if last {
                let remaining = target - cursor;
                transition = transition.min(remaining);
                remaining + transition
            } else {
                full_len
            };

            let slack = (source.duration - len).max(0.0);
            let in_point = if slack > 0.0 { rng.gen_range(0.0..=slack) } else { 0.0 };

            if previous_len.is_some() {
                timeline.transitions.push(if self.options.enable_transitions {
                    TransitionSpec::crossfade(transition)
                } else {
                    TransitionSpec::cut()
                });
            }
            timeline.segments.push(ClipSegment::new(&source.path, in_point, len));
            debug!("Segment {} from {:?}: {:.3}s at {:.3}s", timeline.segments.len(), source.path, len, in_point);

            if last {
                break;
            }

            cursor += full_len - transition;
            previous_len = Some(full_len);
        }

        info!(
            "🎞️ Sequenced {} segments ({} crossfades) for {:.2}s",
            timeline.segments.len(),
            timeline.transitions.iter().filter(|t| t.duration > 0.0).count(),
            timeline.duration()
        );

        Ok(timeline)
    }
}
