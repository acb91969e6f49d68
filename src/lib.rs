//! # Shorts-Composer
//!
//! Assemble short-form vertical videos from a voiceover, optional background
//! music and call-to-action audio, a library of stock clips, and word-level
//! transcript timing.
//!
//! The library turns recognizer output into readable, well-placed subtitle
//! cues, fills the voiceover's duration with trimmed and crossfaded clips,
//! plans a gain-staged audio mix, and drives ffmpeg to render the result.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use shorts_composer::{
//!     composition::{CompositionDirector, CompositionRequest},
//!     config::{Config, JobParams},
//!     render::Capabilities,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let capabilities = Capabilities::detect(&config.render).await;
//! let params = JobParams::from_config(&config);
//! let director = CompositionDirector::from_config(config, capabilities)?;
//!
//! let library = director.scan_clips(&[PathBuf::from("clips/")]).await?;
//! let request = CompositionRequest {
//!     voiceover: "voice.wav".into(),
//!     bgm: Some("music.mp3".into()),
//!     cta: None,
//!     voiceover_words: None,
//!     cta_words: None,
//!     output: "short.mp4".into(),
//!     params,
//! };
//! director.compose(&request, &library).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`subtitles`] - Timestamp normalization, cue segmentation, layout and SRT/ASS output
//! - [`video`] - Clip library scanning and timeline sequencing
//! - [`audio`] - Mix planning, decoding and in-process mixdown
//! - [`composition`] - Plan assembly, validation and the render worker pool
//! - [`render`] - Media backends
//! - [`transcript`] - Recognizer output parsing
//! - [`config`] - Configuration management

pub mod audio;
pub mod composition;
pub mod config;
pub mod error;
pub mod render;
pub mod subtitles;
pub mod transcript;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    composition::{CompositionDirector, CompositionPlan, CompositionRequest},
    config::{Config, JobParams},
    error::{CompositorError, Result},
    render::{Renderer, RendererRegistry},
};
