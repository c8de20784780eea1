//! Resource pattern parsing for the `architecture://` addressing scheme.
//!
//! Resources are addressed as:
//!
//! ```text
//! architecture://{category}/{path-or-*}
//! ```
//!
//! Where:
//! - `category`: `guidelines`, `patterns`, `adr`, or an extension category
//! - `path-or-*`: an exact document path (`.md` implied), a glob over base
//!   filenames, or a bare `*` matching the whole category; optional
//!
//! # Examples
//!
//! ```
//! use archdoc::models::ResourcePattern;
//!
//! // Exact document lookup
//! let pattern = ResourcePattern::parse("architecture://guidelines/api-design").unwrap();
//! assert_eq!(pattern.resource_path(), Some("api-design"));
//!
//! // Everything in a category
//! let pattern = ResourcePattern::parse("architecture://patterns/*").unwrap();
//! assert!(pattern.is_wildcard());
//!
//! // Filename glob within a category
//! let pattern = ResourcePattern::parse("architecture://adr/000*.md").unwrap();
//! assert!(pattern.matches_file_name("0001-storage.md"));
//! ```

use crate::models::Category;
use crate::{Error, Result};
use glob::Pattern;
use std::fmt;
use std::str::FromStr;

/// URI scheme prefix for resource patterns.
pub const RESOURCE_SCHEME: &str = "architecture://";

/// A parsed `architecture://` resource pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePattern {
    /// Category route segment as written in the URI (plural form).
    category: String,
    /// Optional path component after the category.
    resource_path: Option<String>,
    /// Compiled glob, present when the path contains a `*`.
    glob: Option<Pattern>,
    /// Original pattern string for display and error context.
    original: String,
}

impl ResourcePattern {
    /// Parses a resource pattern string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResourceUri`] if the scheme is wrong or
    /// missing, the category is empty, or a wildcard path is not a valid
    /// glob.
    pub fn parse(s: &str) -> Result<Self> {
        let original = s.to_string();

        let remainder = s.strip_prefix(RESOURCE_SCHEME).ok_or_else(|| {
            Error::InvalidResourceUri(format!("pattern must start with '{RESOURCE_SCHEME}': {s}"))
        })?;

        let (category, rest) = match remainder.split_once('/') {
            Some((category, rest)) => (category, Some(rest)),
            None => (remainder, None),
        };

        if category.is_empty() {
            return Err(Error::InvalidResourceUri(format!(
                "pattern has an empty category: {s}"
            )));
        }

        let resource_path = rest.filter(|p| !p.is_empty()).map(ToString::to_string);

        let glob = match resource_path.as_deref() {
            Some(path) if path.contains('*') && path != "*" => Some(
                Pattern::new(path).map_err(|e| {
                    Error::InvalidResourceUri(format!("invalid glob '{path}': {e}"))
                })?,
            ),
            _ => None,
        };

        Ok(Self {
            category: category.to_string(),
            resource_path,
            glob,
            original,
        })
    }

    /// Returns the category route segment as written (plural form).
    #[must_use]
    pub fn category_route(&self) -> &str {
        &self.category
    }

    /// Returns the singular category name the route maps to.
    #[must_use]
    pub fn category_name(&self) -> &str {
        Category::normalize_route(&self.category)
    }

    /// Returns the path component, if present.
    #[must_use]
    pub fn resource_path(&self) -> Option<&str> {
        self.resource_path.as_deref()
    }

    /// Returns `true` if the path component contains a `*`.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.resource_path
            .as_deref()
            .is_some_and(|p| p.contains('*'))
    }

    /// Returns `true` if this pattern selects the whole category.
    ///
    /// An absent path component behaves like a bare `*`.
    #[must_use]
    pub fn matches_all(&self) -> bool {
        matches!(self.resource_path.as_deref(), None | Some("*"))
    }

    /// Matches a document base filename against the glob component.
    ///
    /// Only meaningful in wildcard mode; exact-mode patterns never match
    /// through this predicate.
    #[must_use]
    pub fn matches_file_name(&self, file_name: &str) -> bool {
        if self.matches_all() {
            return true;
        }
        self.glob.as_ref().is_some_and(|g| g.matches(file_name))
    }

    /// Returns the original pattern string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.original
    }
}

impl fmt::Display for ResourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

impl FromStr for ResourcePattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact_pattern() {
        let pattern = ResourcePattern::parse("architecture://guidelines/api-design").unwrap();
        assert_eq!(pattern.category_route(), "guidelines");
        assert_eq!(pattern.category_name(), "guideline");
        assert_eq!(pattern.resource_path(), Some("api-design"));
        assert!(!pattern.is_wildcard());
        assert!(!pattern.matches_all());
    }

    #[test]
    fn test_parse_bare_wildcard() {
        let pattern = ResourcePattern::parse("architecture://patterns/*").unwrap();
        assert!(pattern.is_wildcard());
        assert!(pattern.matches_all());
        assert!(pattern.matches_file_name("anything.md"));
    }

    #[test]
    fn test_parse_category_only() {
        let pattern = ResourcePattern::parse("architecture://adr").unwrap();
        assert_eq!(pattern.category_name(), "adr");
        assert!(pattern.resource_path().is_none());
        assert!(pattern.matches_all());
        assert!(!pattern.is_wildcard());
    }

    #[test]
    fn test_parse_filename_glob() {
        let pattern = ResourcePattern::parse("architecture://adr/000*.md").unwrap();
        assert!(pattern.is_wildcard());
        assert!(!pattern.matches_all());
        assert!(pattern.matches_file_name("0001-storage.md"));
        assert!(pattern.matches_file_name("0009-queues.md"));
        assert!(!pattern.matches_file_name("0100-meta.md"));
    }

    #[test]
    fn test_glob_matches_file_name_not_path() {
        let pattern = ResourcePattern::parse("architecture://patterns/repo*").unwrap();
        // A full path would never match the filename-scoped glob.
        assert!(pattern.matches_file_name("repository.md"));
        assert!(!pattern.matches_file_name("patterns/repository.md"));
    }

    #[test]
    fn test_parse_wrong_scheme() {
        let err = ResourcePattern::parse("docs://guidelines/api").unwrap_err();
        assert!(matches!(err, Error::InvalidResourceUri(_)));
        assert!(err.to_string().contains("architecture://"));
    }

    #[test]
    fn test_parse_missing_scheme() {
        assert!(ResourcePattern::parse("guidelines/api").is_err());
    }

    #[test]
    fn test_parse_empty_category() {
        let err = ResourcePattern::parse("architecture:///api").unwrap_err();
        assert!(err.to_string().contains("empty category"));
    }

    #[test]
    fn test_parse_empty_path_is_category_match() {
        let pattern = ResourcePattern::parse("architecture://patterns/").unwrap();
        assert!(pattern.resource_path().is_none());
        assert!(pattern.matches_all());
    }

    #[test]
    fn test_nested_resource_path() {
        let pattern = ResourcePattern::parse("architecture://patterns/db/repository").unwrap();
        assert_eq!(pattern.resource_path(), Some("db/repository"));
    }

    #[test]
    fn test_extension_category_passes_through() {
        let pattern = ResourcePattern::parse("architecture://runbooks/oncall").unwrap();
        assert_eq!(pattern.category_name(), "runbooks");
    }

    #[test]
    fn test_display_round_trip() {
        let raw = "architecture://patterns/*";
        let pattern: ResourcePattern = raw.parse().unwrap();
        assert_eq!(pattern.to_string(), raw);
        assert_eq!(pattern.as_str(), raw);
    }
}
