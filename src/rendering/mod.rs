//! Template rendering and resource embedding.

mod capabilities;
mod renderer;

pub use capabilities::{NoopStatsRecorder, ResourceStatsRecorder, Tool, ToolResolver};
pub use renderer::{MAX_RESOURCES_PER_PROMPT, MAX_TOTAL_CONTENT_SIZE, TemplateRenderer};
