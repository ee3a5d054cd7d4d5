//! Rendering: the render context, render passes and frame statistics.

mod context;
mod pass;
mod stats;

pub use context::RenderContext;
pub use pass::{RenderPass, RenderPassDescriptor, RenderTarget};
pub use stats::{FrameStatistics, Metric, RenderStats};
