//! # Video Module
//!
//! Clip discovery and timeline sequencing.

pub mod library;
pub mod sequencer;
pub mod types;

pub use library::ClipScanner;
pub use sequencer::{ClipSequencer, SequencerOptions};
pub use types::{ClipLibrary, ClipSegment, Timeline, TransitionKind, TransitionSpec, VideoClip, VideoParams};
