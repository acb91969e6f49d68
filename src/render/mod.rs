//! # Media Backends
//!
//! A validated [`CompositionPlan`](crate::composition::CompositionPlan) is handed
//! to a [`Renderer`], which drives an external encoder to produce the final file.
//!
//! ## Available Renderers
//!
//! - **ffmpeg**: one ffmpeg filter graph does trimming, crossfades, subtitle
//!   burn-in and the audio mix
//! - **premix**: audio is decoded and mixed in-process, ffmpeg encodes the video
//!   against the finished mixdown
//!
//! Renderers are looked up by name through the [`RendererRegistry`].

pub mod ffmpeg;
pub mod premix;
pub mod process;
pub mod registry;
pub mod traits;

pub use ffmpeg::{AudioSource, FfmpegCommand, FfmpegCommandBuilder};
pub use premix::PremixRenderer;
pub use process::{run_backend, FfmpegRenderer};
pub use registry::RendererRegistry;
pub use traits::{Capabilities, RenderOutput, RenderRequest, Renderer};
