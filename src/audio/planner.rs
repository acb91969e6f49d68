use tracing::{debug, info, warn};

use crate::audio::types::{AudioTrack, AudioTrackPlan, LimiterSpec, MixPlan, MixWarning, TrackKind};
use crate::config::{AudioConfig, JobParams};

/// Gains and envelopes applied by the planner
#[derive(Debug, Clone)]
pub struct MixSettings {
    pub bgm_volume: f32,
    pub cta_volume: f32,
    pub bgm_fade_in: f64,
    pub bgm_fade_out: f64,
    pub cta_fade_in: f64,
    pub cta_fade_out: f64,
    pub limiter: Option<LimiterSpec>,
}

impl MixSettings {
    /// Envelope defaults from configuration, gains from the request
    pub fn new(config: &AudioConfig, params: &JobParams) -> Self {
        Self {
            bgm_volume: params.bgm_volume.max(0.0),
            cta_volume: params.cta_volume.max(0.0),
            bgm_fade_in: config.bgm_fade_in,
            bgm_fade_out: config.bgm_fade_out,
            cta_fade_in: config.cta_fade_in,
            cta_fade_out: config.cta_fade_out,
            limiter: config.limiter.then_some(LimiterSpec {
                ceiling: config.limiter_ceiling,
            }),
        }
    }
}

/// Input tracks of one composition
#[derive(Debug, Clone)]
pub struct MixInputs {
    pub voiceover: AudioTrack,
    pub bgm: Option<AudioTrack>,
    pub cta: Option<AudioTrack>,
}

/// Start offset that ends the CTA with the timeline, clamped at zero
pub fn cta_offset(timeline_duration: f64, cta_duration: f64) -> (f64, Option<MixWarning>) {
    let offset = timeline_duration - cta_duration;
    if offset < 0.0 {
        let warning = MixWarning::CtaLongerThanTimeline {
            cta: cta_duration,
            timeline: timeline_duration,
        };
        (0.0, Some(warning))
    } else {
        (offset, None)
    }
}

/// Plans each present track independently against the timeline
pub struct AudioMixPlanner {
    settings: MixSettings,
}

impl AudioMixPlanner {
    pub fn new(settings: MixSettings) -> Self {
        Self { settings }
    }

    pub fn plan(&self, inputs: &MixInputs, timeline_duration: f64) -> MixPlan {
        let timeline = timeline_duration.max(0.0);
        let mut tracks = Vec::with_capacity(3);
        let mut warnings = Vec::new();

        tracks.push(AudioTrackPlan {
            track: TrackKind::Voiceover,
            source: inputs.voiceover.path.clone(),
            gain: 1.0,
            start_offset: 0.0,
            fade_in: 0.0,
            fade_out: 0.0,
            source_duration: inputs.voiceover.duration,
            loop_count: 1,
            play_duration: inputs.voiceover.duration.min(timeline),
        });

        if let Some(bgm) = &inputs.bgm {
            if bgm.duration > 0.0 {
                tracks.push(self.plan_bgm(bgm, timeline));
            } else {
                warnings.push(MixWarning::SilentTrack { track: TrackKind::Bgm });
            }
        }

        if let Some(cta) = &inputs.cta {
            if cta.duration > 0.0 {
                let (plan, warning) = self.plan_cta(cta, timeline);
                tracks.push(plan);
                warnings.extend(warning);
            } else {
                warnings.push(MixWarning::SilentTrack { track: TrackKind::Cta });
            }
        }

        for warning in &warnings {
            warn!("⚠️ {}", warning);
        }
        for track in &tracks {
            debug!(
                "{} plan: gain {:.2}, offset {:.3}s, {:.3}s on timeline, {} loop(s)",
                track.track, track.gain, track.start_offset, track.play_duration, track.loop_count
            );
        }
        info!("🔊 Planned {} audio tracks over {:.2}s", tracks.len(), timeline);

        MixPlan {
            timeline_duration: timeline,
            tracks,
            limiter: self.settings.limiter,
            warnings,
        }
    }

    fn plan_bgm(&self, bgm: &AudioTrack, timeline: f64) -> AudioTrackPlan {
        let loop_count = (timeline / bgm.duration).ceil().max(1.0) as u32;
        AudioTrackPlan {
            track: TrackKind::Bgm,
            source: bgm.path.clone(),
            gain: self.settings.bgm_volume,
            start_offset: 0.0,
            fade_in: self.settings.bgm_fade_in.min(timeline),
            fade_out: self.settings.bgm_fade_out.min(timeline),
            source_duration: bgm.duration,
            loop_count,
            play_duration: timeline,
        }
    }

    fn plan_cta(&self, cta: &AudioTrack, timeline: f64) -> (AudioTrackPlan, Option<MixWarning>) {
        let (start_offset, warning) = cta_offset(timeline, cta.duration);
        let play_duration = cta.duration.min(timeline - start_offset);

        let plan = AudioTrackPlan {
            track: TrackKind::Cta,
            source: cta.path.clone(),
            gain: self.settings.cta_volume,
            start_offset,
            fade_in: self.settings.cta_fade_in.min(play_duration),
            fade_out: self.settings.cta_fade_out.min(play_duration),
            source_duration: cta.duration,
            loop_count: 1,
            play_duration,
        };
        (plan, warning)
    }
}
