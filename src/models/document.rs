//! Document types and category identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Documentation category.
///
/// Used both for cache indexing and for `architecture://` URI routing.
/// Categories outside the three well-known kinds fold to [`Category::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Engineering guidelines.
    Guideline,
    /// Design and implementation patterns.
    Pattern,
    /// Architecture decision records.
    Adr,
    /// Uncategorized documents.
    #[default]
    Unknown,
}

impl Category {
    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Guideline => "guideline",
            Self::Pattern => "pattern",
            Self::Adr => "adr",
            Self::Unknown => "unknown",
        }
    }

    /// Maps a URI route segment to its category name.
    ///
    /// The URI scheme uses plural route names (`guidelines`, `patterns`)
    /// while documents carry singular category names. Route segments with no
    /// well-known mapping pass through unchanged so extension categories can
    /// be compared verbatim.
    #[must_use]
    pub fn normalize_route(segment: &str) -> &str {
        match segment {
            "guidelines" => "guideline",
            "patterns" => "pattern",
            other => other,
        }
    }
}

impl FromStr for Category {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "guideline" => Self::Guideline,
            "pattern" => Self::Pattern,
            "adr" => Self::Adr,
            _ => Self::Unknown,
        })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata for a cached document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Human-readable title, typically the first Markdown heading.
    pub title: String,
    /// Documentation category.
    pub category: Category,
    /// Canonical storage key (repository-relative path).
    pub path: String,
    /// Last modification time of the source file.
    pub last_modified: DateTime<Utc>,
    /// Byte length of the raw content.
    pub size: usize,
    /// Hex-encoded SHA-256 of the raw content.
    pub checksum: String,
}

/// A cached, parsed unit of Markdown content plus metadata.
///
/// Documents are immutable after construction. The cache stores them behind
/// `Arc` and hands the same shared value to every reader, so there is no
/// defensive copying on the lookup path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Document metadata.
    pub metadata: DocumentMetadata,
    /// The full Markdown text.
    pub raw_content: String,
}

impl Document {
    /// Creates a document, deriving size and checksum from the content.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        category: Category,
        path: impl Into<String>,
        raw_content: impl Into<String>,
    ) -> Self {
        let raw_content = raw_content.into();
        Self {
            metadata: DocumentMetadata {
                title: title.into(),
                category,
                path: path.into(),
                last_modified: Utc::now(),
                size: raw_content.len(),
                checksum: content_checksum(&raw_content),
            },
            raw_content,
        }
    }

    /// Sets the last-modified timestamp.
    #[must_use]
    pub fn with_last_modified(mut self, at: DateTime<Utc>) -> Self {
        self.metadata.last_modified = at;
        self
    }

    /// Returns the storage key (the metadata path).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.metadata.path
    }

    /// Returns the base filename of the storage key.
    ///
    /// Used for wildcard matching, which operates on filenames rather than
    /// full paths.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.metadata
            .path
            .rsplit('/')
            .next()
            .unwrap_or(&self.metadata.path)
    }
}

/// Computes the hex-encoded SHA-256 checksum of document content.
#[must_use]
pub(crate) fn content_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Per-category summary of cached documents.
///
/// Rebuilt wholesale by the ingestion pipeline; the cache only stores and
/// retrieves it keyed by category name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentIndex {
    /// The category this index summarizes.
    pub category: Category,
    /// Ordered metadata records for every document in the category.
    pub documents: Vec<DocumentMetadata>,
    /// Number of documents in the category.
    pub count: usize,
}

impl DocumentIndex {
    /// Creates an index from a list of metadata records.
    #[must_use]
    pub fn new(category: Category, documents: Vec<DocumentMetadata>) -> Self {
        let count = documents.len();
        Self {
            category,
            documents,
            count,
        }
    }
}
