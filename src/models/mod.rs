//! Data models for cached documents and resource addressing.

mod document;
mod resource;

pub use document::{Category, Document, DocumentIndex, DocumentMetadata};
pub use resource::{RESOURCE_SCHEME, ResourcePattern};
