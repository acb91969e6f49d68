//! Word timing to subtitle markup
//!
//! Normalizer, segmenter, layout engine and serializer form a strictly
//! sequential chain; each stage consumes the complete output of the previous.

pub mod ass;
pub mod layout;
pub mod normalizer;
pub mod segmenter;
pub mod serializer;
pub mod srt;
pub mod types;

pub use layout::{Anchor, LayoutEngine, LayoutSpec, Orientation};
pub use normalizer::TimestampNormalizer;
pub use segmenter::{CueSegmenter, SegmenterOptions};
pub use serializer::{PlacedCue, SubtitleArtifact, SubtitleSerializer};
pub use types::{Cue, LineMode, SubtitleFormat, TextCase, WordOrigin, WordTiming};
