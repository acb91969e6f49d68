//! # Audio Module
//!
//! Duration probing, per-track mix planning, and the in-process mixdown used
//! by the premix renderer.
//!
//! ```rust,no_run
//! use shorts_composer::audio::{AudioLoader, AudioMixPlanner, AudioTrack, MixInputs, MixSettings, TrackKind};
//! use shorts_composer::config::{AudioConfig, JobParams};
//!
//! # fn main() -> anyhow::Result<()> {
//! let voice = AudioLoader::probe_duration("voice.wav")?;
//! let planner = AudioMixPlanner::new(MixSettings::new(&AudioConfig::default(), &JobParams::default()));
//! let plan = planner.plan(
//!     &MixInputs {
//!         voiceover: AudioTrack::new(TrackKind::Voiceover, "voice.wav", voice),
//!         bgm: None,
//!         cta: None,
//!     },
//!     voice,
//! );
//! println!("{} tracks", plan.tracks.len());
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod mixer;
pub mod planner;
pub mod types;

pub use loader::AudioLoader;
pub use mixer::Mixer;
pub use planner::{cta_offset, AudioMixPlanner, MixInputs, MixSettings};
pub use types::{AudioData, AudioTrack, AudioTrackPlan, LimiterSpec, MixPlan, MixWarning, TrackKind};
