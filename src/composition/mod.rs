//! # Composition
//!
//! The director coordinates subtitle generation, clip sequencing and audio mix
//! planning into one validated [`CompositionPlan`], then hands it to a media
//! backend under a bounded worker pool.

pub mod director;
pub mod plan;
pub mod pool;

// Re-exports for convenience
pub use director::{CompositionDirector, CompositionOutput, CompositionRequest, PreparedInputs, RenderSummary};
pub use plan::CompositionPlan;
pub use pool::WorkerPool;
