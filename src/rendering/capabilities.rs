//! Externally supplied capabilities the renderer calls into but does not own.
//!
//! The outer server wires these in once at startup. The stats recorder
//! defaults to a no-op implementation so render passes never need to check
//! for its presence; the tool resolver stays optional because its absence
//! changes behavior (tool references pass through untouched).

use crate::Result;
use std::sync::Arc;

/// Observer notified on every resource embedding.
pub trait ResourceStatsRecorder: Send + Sync {
    /// Records that one document was embedded into a prompt.
    ///
    /// `cache_hit` is `true` when the document came from the cache; all
    /// resolution in this core is inherently cache-backed, so the renderer
    /// always passes `true`.
    fn record_resource_embedding(&self, cache_hit: bool);
}

/// Stats recorder that discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStatsRecorder;

impl ResourceStatsRecorder for NoopStatsRecorder {
    fn record_resource_embedding(&self, _cache_hit: bool) {}
}

/// A tool the renderer can describe inside a prompt.
///
/// The schema is JSON-Schema-shaped: an object with `properties` and an
/// optional `required` list. Constraint keywords (`maxLength`, `minLength`,
/// `maximum`, `minimum`, `enum`) become inline annotations in the rendered
/// block.
pub trait Tool: Send + Sync {
    /// Tool name as referenced from templates.
    fn name(&self) -> &str;
    /// Human-readable description.
    fn description(&self) -> &str;
    /// JSON-Schema-shaped input schema.
    fn input_schema(&self) -> serde_json::Value;
}

/// Looks up tools by name for the tool-embedding pass.
pub trait ToolResolver: Send + Sync {
    /// Resolves a tool by name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ToolNotFound`] for unknown names.
    fn get_tool(&self, name: &str) -> Result<Arc<dyn Tool>>;
}
