//! End-to-end tests exercising the cache and renderer together.

use archdoc::cache::DocumentCache;
use archdoc::models::{Category, Document, DocumentIndex};
use archdoc::rendering::{TemplateRenderer, Tool, ToolResolver};
use archdoc::{ArchdocConfig, Error};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn seeded_cache() -> Arc<DocumentCache> {
    let cache = Arc::new(DocumentCache::new(&ArchdocConfig::default()));
    cache.set(
        "guidelines/api-design.md",
        Document::new(
            "API Design",
            Category::Guideline,
            "guidelines/api-design.md",
            "Use REST. Version every endpoint.",
        ),
    );
    cache.set(
        "patterns/repository.md",
        Document::new(
            "Repository Pattern",
            Category::Pattern,
            "patterns/repository.md",
            "Mediate between domain and data mapping layers.",
        ),
    );
    cache.set(
        "patterns/cqrs.md",
        Document::new(
            "CQRS",
            Category::Pattern,
            "patterns/cqrs.md",
            "Separate reads from writes.",
        ),
    );
    cache.set(
        "adr/0001-storage.md",
        Document::new(
            "Use SQLite",
            Category::Adr,
            "adr/0001-storage.md",
            "We will use SQLite for local persistence.",
        ),
    );
    cache
}

struct EchoTool;

impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Echoes its input"
    }
    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "Text to echo back",
                    "maxLength": 200
                }
            },
            "required": ["message"]
        })
    }
}

struct SingleToolResolver;

impl ToolResolver for SingleToolResolver {
    fn get_tool(&self, name: &str) -> archdoc::Result<Arc<dyn Tool>> {
        if name == "echo" {
            Ok(Arc::new(EchoTool))
        } else {
            Err(Error::ToolNotFound {
                name: name.to_string(),
            })
        }
    }
}

#[test]
fn test_full_render_pipeline() {
    let cache = seeded_cache();
    let mut renderer = TemplateRenderer::new(Arc::clone(&cache));
    renderer.set_tool_manager(Arc::new(SingleToolResolver));

    let template = "\
You are reviewing a {{component}} change.

Relevant guidance:
{{resource:architecture://guidelines/api-design}}

Available tools:
{{tool:echo}}";

    let mut args = HashMap::new();
    args.insert("component".to_string(), json!("billing"));

    let rendered = renderer.render(template, &args).unwrap();

    assert!(rendered.contains("reviewing a billing change"));
    assert!(rendered.contains("# API Design"));
    assert!(rendered.contains("Source: guidelines/api-design.md"));
    assert!(rendered.contains("Version every endpoint."));
    assert!(rendered.contains("Tool: echo"));
    assert!(rendered.contains("- message (required): Text to echo back (max 200 chars)"));
    assert!(!rendered.contains("{{"));
    cache.close();
}

#[test]
fn test_wildcard_embeds_whole_category() {
    let cache = seeded_cache();
    let renderer = TemplateRenderer::new(Arc::clone(&cache));

    let rendered = renderer
        .embed_resources("{{resource:architecture://patterns/*}}")
        .unwrap();

    assert!(rendered.contains("# Repository Pattern"));
    assert!(rendered.contains("# CQRS"));
    assert!(rendered.contains("\n\n---\n\n"));
    // Guideline content stays out of a patterns wildcard.
    assert!(!rendered.contains("Use REST."));
    cache.close();
}

#[test]
fn test_hit_ratio_two_thirds() {
    let cache = seeded_cache();

    let _ = cache.get("guidelines/api-design.md");
    let _ = cache.get("patterns/cqrs.md");
    let _ = cache.get("patterns/does-not-exist.md");

    let ratio = cache.get_cache_hit_ratio();
    assert!((ratio - 200.0 / 3.0).abs() < 1e-9, "ratio was {ratio}");

    let report = cache.get_performance_metrics();
    assert_eq!(report.document_count, 4);
    assert_eq!(report.stats.hits, 2);
    assert_eq!(report.stats.misses, 1);
    cache.close();
}

#[test]
fn test_invalidation_then_render_fails() {
    let cache = seeded_cache();
    let renderer = TemplateRenderer::new(Arc::clone(&cache));

    let removed = cache.invalidate_by_category("pattern");
    assert_eq!(removed, 2);

    let err = renderer
        .embed_resources("{{resource:architecture://patterns/*}}")
        .unwrap_err();
    assert!(matches!(err, Error::ResourceNotFound { .. }));

    // Other categories are untouched.
    assert!(renderer
        .embed_resources("{{resource:architecture://adr/0001-storage}}")
        .is_ok());
    cache.close();
}

#[test]
fn test_quota_failure_returns_no_partial_output() {
    let cache = Arc::new(DocumentCache::new(&ArchdocConfig::default()));
    for i in 0..60 {
        let path = format!("patterns/p{i:02}.md");
        cache.set(
            path.clone(),
            Document::new(format!("Pattern {i}"), Category::Pattern, path, "body"),
        );
    }
    let renderer = TemplateRenderer::new(Arc::clone(&cache));

    let err = renderer
        .embed_resources("intro {{resource:architecture://patterns/*}} outro")
        .unwrap_err();
    match err {
        Error::QuotaExceeded { kind, limit, actual } => {
            assert_eq!(kind, "resource count");
            assert_eq!(limit, 50);
            assert_eq!(actual, 60);
        },
        other => panic!("unexpected error: {other}"),
    }
    cache.close();
}

#[test]
fn test_tool_pass_degrades_without_resolver() {
    let cache = seeded_cache();
    let renderer = TemplateRenderer::new(Arc::clone(&cache));

    let args = HashMap::new();
    let rendered = renderer
        .render("Call {{tool:echo}} when done", &args)
        .unwrap();
    assert_eq!(rendered, "Call {{tool:echo}} when done");
    cache.close();
}

#[test]
fn test_index_round_trip_through_cache() {
    let cache = seeded_cache();

    let metadata: Vec<_> = cache
        .get_by_category("pattern")
        .iter()
        .map(|doc| doc.metadata.clone())
        .collect();
    cache.set_index("pattern", DocumentIndex::new(Category::Pattern, metadata));

    let index = cache.get_index("pattern").unwrap();
    assert_eq!(index.count, 2);
    assert_eq!(index.category, Category::Pattern);
    cache.close();
}

#[test]
fn test_eviction_under_pressure_keeps_renderer_working() {
    let config = ArchdocConfig::new()
        .with_max_memory_bytes(64 * 1024)
        .with_cleanup_interval(Duration::from_secs(3600));
    let cache = Arc::new(DocumentCache::new(&config));
    let content = "x".repeat(4 * 1024);

    for i in 0..40 {
        let path = format!("patterns/bulk-{i:02}.md");
        cache.set(
            path.clone(),
            Document::new(format!("Bulk {i}"), Category::Pattern, path, &content),
        );
    }

    // Inserts past 80% of the budget trigger eviction passes, so the store
    // ends smaller than the insert count but still serves renders.
    assert!(cache.size() < 40);
    assert!(cache.get_stats().invalidations > 0);

    let renderer = TemplateRenderer::new(Arc::clone(&cache));
    // The newest insert survives its own insert-time eviction pass.
    let rendered = renderer
        .embed_resources("{{resource:architecture://patterns/bulk-39}}")
        .unwrap();
    assert!(rendered.contains("# Bulk 39"));
    cache.close();
}

#[test]
fn test_concurrent_render_and_ingest() {
    let cache = seeded_cache();
    let renderer = Arc::new(TemplateRenderer::new(Arc::clone(&cache)));

    let render_handle = {
        let renderer = Arc::clone(&renderer);
        std::thread::spawn(move || {
            for _ in 0..50 {
                let _ = renderer.embed_resources("{{resource:architecture://patterns/*}}");
            }
        })
    };
    let ingest_handle = {
        let cache = Arc::clone(&cache);
        std::thread::spawn(move || {
            for i in 0..50 {
                let path = format!("patterns/live-{i}.md");
                cache.set(
                    path.clone(),
                    Document::new("Live", Category::Pattern, path, "streamed in"),
                );
            }
        })
    };

    render_handle.join().unwrap();
    ingest_handle.join().unwrap();

    assert_eq!(cache.size(), 54);
    cache.close();
}

#[test]
fn test_clear_resets_everything() {
    let cache = seeded_cache();
    let _ = cache.get("patterns/cqrs.md");
    let _ = cache.get("missing.md");

    cache.clear();

    assert!(cache.is_empty());
    let stats = cache.get_stats();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 0);
    assert_eq!(stats.memory_usage, 0);
    assert!(cache.get_categories().is_empty());
    cache.close();
}
