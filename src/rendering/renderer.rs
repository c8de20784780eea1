//! Template renderer implementation.
//!
//! Provides the three-pass rewriting pipeline that turns a prompt template
//! into final prompt text:
//!
//! 1. Variable substitution (`{{identifier}}`)
//! 2. Resource embedding (`{{resource:architecture://...}}`)
//! 3. Tool embedding (`{{tool:name}}`)
//!
//! Callers must run the passes in that order: resource and tool placeholders
//! are plain text until their own pass runs, and the variable identifier
//! pattern excludes `:` so pass 1 can never rewrite the literal `resource:`
//! or `tool:` tokens.
//!
//! Every pass takes an immutable input string and returns a new string. Any
//! failure aborts the whole pass with no partial output.

use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::{Arc, LazyLock};
use std::time::Instant;

use crate::cache::DocumentCache;
use crate::config::ResourcePaths;
use crate::models::{Document, ResourcePattern};
use crate::rendering::{NoopStatsRecorder, ResourceStatsRecorder, ToolResolver};
use crate::{Error, Result};

/// Maximum number of resolved documents per render call.
pub const MAX_RESOURCES_PER_PROMPT: usize = 50;

/// Maximum total embedded content bytes per render call: 1 MiB.
pub const MAX_TOTAL_CONTENT_SIZE: usize = 1024 * 1024;

/// Creates a compile-time verified regex wrapped in [`LazyLock`].
///
/// The pattern is a literal verified by tests; the `unreachable!()` branch
/// exists only for type checking.
macro_rules! lazy_regex {
    ($pattern:expr) => {
        LazyLock::new(|| Regex::new($pattern).unwrap_or_else(|_| unreachable!()))
    };
}

/// Regex for variable placeholders: `{{identifier}}`.
static VARIABLE_PATTERN: LazyLock<Regex> = lazy_regex!(r"\{\{([A-Za-z0-9_-]+)\}\}");

/// Regex for resource placeholders: `{{resource:<pattern>}}`.
static RESOURCE_PATTERN: LazyLock<Regex> = lazy_regex!(r"\{\{resource:([^}]+)\}\}");

/// Regex for tool placeholders: `{{tool:<name>}}`.
static TOOL_PATTERN: LazyLock<Regex> = lazy_regex!(r"\{\{tool:([a-z0-9-]+)\}\}");

/// Template rendering engine.
///
/// Holds a read-only handle to the document cache and the two wiring-time
/// capabilities. Carries no interior locks: renders may proceed fully in
/// parallel, and there is no cancellation or timeout inside the core.
pub struct TemplateRenderer {
    cache: Arc<DocumentCache>,
    paths: ResourcePaths,
    stats: Arc<dyn ResourceStatsRecorder>,
    tools: Option<Arc<dyn ToolResolver>>,
}

impl TemplateRenderer {
    /// Creates a renderer over the given cache with default resource paths.
    #[must_use]
    pub fn new(cache: Arc<DocumentCache>) -> Self {
        Self {
            cache,
            paths: ResourcePaths::default(),
            stats: Arc::new(NoopStatsRecorder),
            tools: None,
        }
    }

    /// Sets the per-category resource base directories.
    #[must_use]
    pub fn with_resource_paths(mut self, paths: ResourcePaths) -> Self {
        self.paths = paths;
        self
    }

    /// Wires in a stats recorder, replacing the default no-op one.
    pub fn set_stats_recorder(&mut self, recorder: Arc<dyn ResourceStatsRecorder>) {
        self.stats = recorder;
    }

    /// Wires in a tool resolver.
    ///
    /// Without one, the tool pass returns its input unchanged.
    pub fn set_tool_manager(&mut self, resolver: Arc<dyn ToolResolver>) {
        self.tools = Some(resolver);
    }

    /// Runs all three passes in their required order.
    ///
    /// # Errors
    ///
    /// Propagates any failure from the resource or tool pass.
    pub fn render(&self, template: &str, args: &HashMap<String, Value>) -> Result<String> {
        let substituted = self.render_template(template, args)?;
        let with_resources = self.embed_resources(&substituted)?;
        self.embed_tools(&with_resources)
    }

    /// Pass 1: substitutes `{{identifier}}` placeholders from `args`.
    ///
    /// Identifiers are letters, digits, `-` and `_`. Present arguments
    /// replace every literal occurrence of their placeholder; absent
    /// arguments leave the placeholder untouched (an unset optional
    /// argument, or an upstream validation gap — not this pass's concern).
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` keeps the pass signatures uniform.
    #[allow(clippy::unnecessary_wraps)]
    pub fn render_template(&self, template: &str, args: &HashMap<String, Value>) -> Result<String> {
        let mut result = template.to_string();
        for caps in VARIABLE_PATTERN.captures_iter(template) {
            let placeholder = &caps[0];
            let name = &caps[1];
            if let Some(value) = args.get(name) {
                result = result.replace(placeholder, &value_to_string(value));
            }
        }
        Ok(result)
    }

    /// Pass 2: embeds resolved documents for `{{resource:<pattern>}}`.
    ///
    /// A running document count and embedded-byte total accumulate across
    /// every placeholder in the call; a pattern occurring twice is resolved
    /// and counted twice, never amortized. Breaching either quota fails the
    /// whole call with no partial output.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidResourceUri`] / [`Error::ResourceNotFound`] from
    ///   pattern resolution
    /// - [`Error::QuotaExceeded`] past 50 documents or 1 MiB of content
    pub fn embed_resources(&self, template: &str) -> Result<String> {
        let start = Instant::now();
        let mut result = template.to_string();
        let mut resource_count = 0usize;
        let mut total_bytes = 0usize;

        for caps in RESOURCE_PATTERN.captures_iter(template) {
            let placeholder = &caps[0];
            let pattern = &caps[1];

            let documents = self.resolve_resource_pattern(pattern)?;

            resource_count += documents.len();
            if resource_count > MAX_RESOURCES_PER_PROMPT {
                return Err(Error::QuotaExceeded {
                    kind: "resource count",
                    limit: MAX_RESOURCES_PER_PROMPT,
                    actual: resource_count,
                });
            }

            total_bytes += documents.iter().map(|d| d.raw_content.len()).sum::<usize>();
            if total_bytes > MAX_TOTAL_CONTENT_SIZE {
                return Err(Error::QuotaExceeded {
                    kind: "content size",
                    limit: MAX_TOTAL_CONTENT_SIZE,
                    actual: total_bytes,
                });
            }

            result = result.replace(placeholder, &render_resource_block(&documents));
        }

        metrics::histogram!("template_pass_duration_ms", "pass" => "resources")
            .record(start.elapsed().as_secs_f64() * 1000.0);
        tracing::debug!(
            resources = resource_count,
            bytes = total_bytes,
            "Embedded resources into template"
        );
        Ok(result)
    }

    /// Resolves an `architecture://` pattern against a cache snapshot.
    ///
    /// Documents are filtered to the pattern's category, then matched either
    /// by filename glob (wildcard mode) or byte-for-byte against the
    /// constructed `<base dir>/<path>.md` storage key (exact mode). The
    /// stats recorder is notified once per matched document.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidResourceUri`] for a malformed pattern
    /// - [`Error::ResourceNotFound`] when nothing matches
    pub fn resolve_resource_pattern(&self, pattern: &str) -> Result<Vec<Arc<Document>>> {
        let parsed = ResourcePattern::parse(pattern)?;
        let category = parsed.category_name();

        let snapshot = self.cache.get_all_documents();
        let mut matched: Vec<(String, Arc<Document>)> = if parsed.is_wildcard() {
            snapshot
                .into_iter()
                .filter(|(_, doc)| doc.metadata.category.as_str() == category)
                .filter(|(key, _)| parsed.matches_file_name(base_file_name(key)))
                .collect()
        } else {
            let expected = self.expected_exact_path(&parsed);
            snapshot
                .into_iter()
                .filter(|(_, doc)| doc.metadata.category.as_str() == category)
                .filter(|(key, _)| match &expected {
                    Some(path) => key == path,
                    // No path component: the whole category matches.
                    None => true,
                })
                .collect()
        };

        if matched.is_empty() {
            return Err(Error::ResourceNotFound {
                pattern: pattern.to_string(),
            });
        }

        // Snapshot iteration order is unspecified; sort for stable output.
        matched.sort_by(|(a, _), (b, _)| a.cmp(b));

        for _ in &matched {
            self.stats.record_resource_embedding(true);
        }
        metrics::counter!("resource_embeddings_total").increment(matched.len() as u64);

        Ok(matched.into_iter().map(|(_, doc)| doc).collect())
    }

    /// Pass 3: expands `{{tool:<name>}}` into capability description blocks.
    ///
    /// With no resolver configured the template passes through unchanged —
    /// a deliberate degrade, unlike the strict resource pass.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolNotFound`] when a resolver is configured and a
    /// referenced tool is unknown; the whole call fails.
    pub fn embed_tools(&self, template: &str) -> Result<String> {
        let Some(resolver) = &self.tools else {
            return Ok(template.to_string());
        };

        let mut result = template.to_string();
        for caps in TOOL_PATTERN.captures_iter(template) {
            let placeholder = &caps[0];
            let name = &caps[1];

            let tool = resolver.get_tool(name)?;
            result = result.replace(placeholder, &render_tool_block(tool.as_ref()));
        }
        Ok(result)
    }

    /// Builds the storage key an exact-mode pattern must equal.
    ///
    /// Joins the category's configured base directory with the resource
    /// path, appending `.md` when missing. `None` when the pattern has no
    /// path component.
    fn expected_exact_path(&self, pattern: &ResourcePattern) -> Option<String> {
        let resource_path = pattern.resource_path()?;
        let base = self.paths.base_dir_for(pattern.category_name());
        let mut path = format!("{base}/{resource_path}");
        if !path.ends_with(".md") {
            path.push_str(".md");
        }
        Some(path)
    }
}

impl std::fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRenderer")
            .field("paths", &self.paths)
            .field("has_tool_resolver", &self.tools.is_some())
            .finish_non_exhaustive()
    }
}

/// Converts a JSON argument value to its substitution text.
///
/// Strings substitute unquoted; every other value uses its compact JSON
/// form (`42`, `true`, `[1,2]`).
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Returns the base filename of a storage key.
fn base_file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Renders resolved documents as a single embeddable block.
///
/// Each document contributes a `# <Title>` line, a `Source: <Path>` line
/// and its raw content; documents after the first are separated by a
/// horizontal rule.
fn render_resource_block(documents: &[Arc<Document>]) -> String {
    let mut out = String::new();
    for (i, doc) in documents.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n---\n\n");
        }
        let _ = writeln!(out, "# {}", doc.metadata.title);
        let _ = writeln!(out, "Source: {}", doc.metadata.path);
        out.push('\n');
        out.push_str(&doc.raw_content);
    }
    out
}

/// Renders a tool capability description block.
fn render_tool_block(tool: &dyn crate::rendering::Tool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Tool: {}", tool.name());
    let _ = writeln!(out, "Description: {}", tool.description());
    out.push_str("Parameters:\n");

    let schema = tool.input_schema();
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (name, property) in properties {
            let requirement = if required.contains(&name.as_str()) {
                "required"
            } else {
                "optional"
            };
            let _ = write!(out, "- {name} ({requirement})");
            if let Some(description) = property.get("description").and_then(Value::as_str) {
                let _ = write!(out, ": {description}");
            }
            let constraints = property_constraints(property);
            if !constraints.is_empty() {
                let _ = write!(out, " ({})", constraints.join(", "));
            }
            out.push('\n');
        }
    }
    out
}

/// Collects inline constraint annotations from a schema property.
fn property_constraints(property: &Value) -> Vec<String> {
    let mut constraints = Vec::new();
    if let Some(n) = property.get("maxLength").and_then(Value::as_u64) {
        constraints.push(format!("max {n} chars"));
    }
    if let Some(n) = property.get("minLength").and_then(Value::as_u64) {
        constraints.push(format!("min {n} chars"));
    }
    if let Some(n) = property.get("maximum").and_then(Value::as_f64) {
        constraints.push(format!("max {}", trim_number(n)));
    }
    if let Some(n) = property.get("minimum").and_then(Value::as_f64) {
        constraints.push(format!("min {}", trim_number(n)));
    }
    if let Some(options) = property.get("enum").and_then(Value::as_array) {
        let rendered: Vec<String> = options
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        constraints.push(format!("one of: {}", rendered.join(", ")));
    }
    constraints
}

/// Formats a JSON number without a trailing `.0` for whole values.
#[allow(clippy::cast_possible_truncation)]
fn trim_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
