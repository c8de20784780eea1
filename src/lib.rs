//! # Archdoc
//!
//! In-memory documentation cache and prompt resource resolution for AI
//! coding agents.
//!
//! Archdoc holds parsed Markdown documents (guidelines, patterns, ADRs) in a
//! concurrency-safe, memory-bounded cache and re-exposes them as addressable
//! resources that can be substituted into prompt templates through an
//! `architecture://` URI scheme.
//!
//! ## Architecture
//!
//! - [`cache::DocumentCache`] — the owned document store with category
//!   indexing, hit/miss accounting and approximate-size-triggered eviction.
//! - [`rendering::TemplateRenderer`] — a three-pass rewriting pipeline
//!   (variables, resources, tools) that resolves embedded document references
//!   against the cache under hard count and byte quotas.
//!
//! Ingestion (file watching, Markdown parsing) and the outer protocol
//! transport are external collaborators; this crate only defines the
//! capability traits they plug into.
//!
//! ## Example
//!
//! ```rust
//! use archdoc::cache::DocumentCache;
//! use archdoc::models::{Category, Document};
//! use archdoc::rendering::TemplateRenderer;
//! use archdoc::ArchdocConfig;
//! use std::sync::Arc;
//!
//! let cache = Arc::new(DocumentCache::new(&ArchdocConfig::default()));
//! cache.set(
//!     "guidelines/api-design.md",
//!     Document::new("API Design", Category::Guideline, "guidelines/api-design.md", "Use REST."),
//! );
//!
//! let renderer = TemplateRenderer::new(Arc::clone(&cache));
//! let text = renderer
//!     .embed_resources("{{resource:architecture://guidelines/api-design}}")
//!     .unwrap();
//! assert!(text.contains("# API Design"));
//! cache.close();
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod cache;
pub mod config;
pub mod models;
pub mod rendering;

// Re-exports for convenience
pub use cache::{CacheStats, DocumentCache, PerformanceReport};
pub use config::{ArchdocConfig, CacheConfig, ResourcePaths};
pub use models::{Category, Document, DocumentIndex, DocumentMetadata, ResourcePattern};
pub use rendering::{ResourceStatsRecorder, TemplateRenderer, Tool, ToolResolver};

/// Error type for archdoc operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `CacheMiss` | Looking up a document key that is not cached (expected in normal operation) |
/// | `InvalidResourceUri` | Resource pattern has a wrong scheme or empty category (caller error) |
/// | `ResourceNotFound` | Pattern is well-formed but matches zero cached documents |
/// | `QuotaExceeded` | A render breaches the resource-count or embedded-byte quota |
/// | `ToolNotFound` | A tool reference names an unknown tool while a resolver is configured |
/// | `OperationFailed` | Config file I/O or parse failures |
#[derive(Debug, ThisError)]
pub enum Error {
    /// A document key was not found in the cache.
    ///
    /// Recoverable and expected during normal operation; callers typically
    /// fall back to reloading from the ingestion pipeline.
    #[error("cache miss for key '{key}'")]
    CacheMiss {
        /// The key that was looked up.
        key: String,
    },

    /// A resource URI was malformed.
    ///
    /// Raised when:
    /// - The pattern does not start with `architecture://`
    /// - The category component is empty
    ///
    /// Caller error, not retryable.
    #[error("invalid resource URI: {0}")]
    InvalidResourceUri(String),

    /// A syntactically valid resource pattern matched nothing.
    ///
    /// Fatal to the render: zero matches is an error, not an empty embed.
    #[error("no resources found matching pattern '{pattern}'")]
    ResourceNotFound {
        /// The pattern that produced no matches.
        pattern: String,
    },

    /// A render quota was breached.
    ///
    /// Fatal to the render; no partial output is returned.
    #[error("{kind} quota exceeded: {actual} > {limit}")]
    QuotaExceeded {
        /// Which quota was breached ("resource count" or "content size").
        kind: &'static str,
        /// The configured limit.
        limit: usize,
        /// The value that breached it.
        actual: usize,
    },

    /// A referenced tool is unknown to the configured resolver.
    #[error("tool not found: '{name}'")]
    ToolNotFound {
        /// The tool name from the template.
        name: String,
    },

    /// An operation failed.
    ///
    /// Raised when:
    /// - Config file reads fail
    /// - TOML parsing fails
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

/// Result type alias for archdoc operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CacheMiss {
            key: "guidelines/api.md".to_string(),
        };
        assert_eq!(err.to_string(), "cache miss for key 'guidelines/api.md'");

        let err = Error::InvalidResourceUri("bad://x".to_string());
        assert_eq!(err.to_string(), "invalid resource URI: bad://x");

        let err = Error::ResourceNotFound {
            pattern: "architecture://patterns/missing".to_string(),
        };
        assert!(err.to_string().contains("no resources found"));

        let err = Error::QuotaExceeded {
            kind: "resource count",
            limit: 50,
            actual: 51,
        };
        assert_eq!(err.to_string(), "resource count quota exceeded: 51 > 50");

        let err = Error::ToolNotFound {
            name: "search".to_string(),
        };
        assert_eq!(err.to_string(), "tool not found: 'search'");
    }
}
