use std::collections::HashMap;
use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::audio::types::{AudioData, AudioTrackPlan, LimiterSpec, MixPlan, TrackKind};
use crate::error::{AudioError, Result};

/// Fraction of the ceiling below which the limiter leaves samples untouched
const LIMITER_KNEE: f32 = 0.8;

/// Sample-level mixdown of a `MixPlan`
pub struct Mixer {
    sample_rate: u32,
    channels: u16,
}

impl Mixer {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            channels: channels.max(1),
        }
    }

    /// Render the plan into interleaved samples at the mixer's rate and layout
    pub fn mix(&self, plan: &MixPlan, sources: &HashMap<TrackKind, AudioData>) -> Result<AudioData> {
        let frames = (plan.timeline_duration * self.sample_rate as f64).round() as usize;
        let channels = self.channels as usize;
        let rate = self.sample_rate as f64;

        let tracks: Vec<(&AudioTrackPlan, &AudioData)> = plan
            .tracks
            .iter()
            .map(|track| {
                sources
                    .get(&track.track)
                    .map(|audio| (track, audio))
                    .ok_or_else(|| AudioError::DecodingFailed {
                        reason: format!("no decoded audio for the {} track", track.track),
                    })
            })
            .collect::<std::result::Result<_, _>>()?;

        let mut samples = vec![0.0f32; frames * channels];
        samples
            .par_chunks_mut(channels)
            .enumerate()
            .for_each(|(frame, out)| {
                let time = frame as f64 / rate;
                for (track, audio) in &tracks {
                    let local = time - track.start_offset;
                    let gain = track.envelope(local);
                    if gain == 0.0 {
                        continue;
                    }

                    let source_time = if track.loop_count > 1 && track.source_duration > 0.0 {
                        local % track.source_duration
                    } else {
                        local
                    };

                    for (ch, sample) in out.iter_mut().enumerate() {
                        *sample += audio.sample_at(source_time, ch) * gain;
                    }
                }
            });

        if let Some(limiter) = plan.limiter {
            apply_limiter(&mut samples, limiter);
        }

        let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        debug!("Mixed {} frames from {} tracks, peak {:.3}", frames, tracks.len(), peak);

        Ok(AudioData::from_samples(samples, self.sample_rate, self.channels))
    }
}

/// Soft-knee limiter: identity below the knee, asymptotic to the ceiling above it
pub fn apply_limiter(samples: &mut [f32], limiter: LimiterSpec) {
    let ceiling = limiter.ceiling;
    let knee = ceiling * LIMITER_KNEE;
    let headroom = ceiling - knee;

    samples.par_iter_mut().for_each(|sample| {
        let magnitude = sample.abs();
        if magnitude > knee {
            let limited = knee + headroom * ((magnitude - knee) / headroom).tanh();
            *sample = limited.min(ceiling).copysign(*sample);
        }
    });
}

/// Write samples as 16-bit PCM WAV
pub fn write_wav(path: &Path, audio: &AudioData) -> Result<()> {
    let spec = hound::WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let failed = |e: hound::Error| AudioError::WriteFailed { reason: e.to_string() };
    let mut writer = hound::WavWriter::create(path, spec).map_err(failed)?;
    for sample in &audio.samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        writer.write_sample(value).map_err(failed)?;
    }
    writer.finalize().map_err(failed)?;

    info!("💾 Premixed audio written to {:?} ({:.2}s)", path, audio.duration);
    Ok(())
}
