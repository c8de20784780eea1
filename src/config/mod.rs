//! Configuration management.

use serde::Deserialize;
use std::time::Duration;

/// Default maximum cache memory budget: 256 MiB.
pub const DEFAULT_MAX_MEMORY_BYTES: usize = 256 * 1024 * 1024;

/// Default background cleanup interval: 5 minutes.
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 300;

/// Main configuration for archdoc.
#[derive(Debug, Clone, Default)]
pub struct ArchdocConfig {
    /// Document cache tuning.
    pub cache: CacheConfig,
    /// Per-category resource base directories.
    pub resources: ResourcePaths,
}

/// Document cache tuning.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum estimated memory budget in bytes.
    pub max_memory_bytes: usize,
    /// Interval between background cleanup cycles.
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_memory_bytes: DEFAULT_MAX_MEMORY_BYTES,
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
        }
    }
}

/// Base directories used to build exact-match resource paths.
///
/// The three well-known categories each map to a distinct directory; any
/// extension category resolves under `resources_dir/<category>`.
#[derive(Debug, Clone)]
pub struct ResourcePaths {
    /// Base directory for guideline documents.
    pub guidelines_dir: String,
    /// Base directory for pattern documents.
    pub patterns_dir: String,
    /// Base directory for ADR documents.
    pub adr_dir: String,
    /// Base directory for extension categories.
    pub resources_dir: String,
}

impl Default for ResourcePaths {
    fn default() -> Self {
        Self {
            guidelines_dir: "guidelines".to_string(),
            patterns_dir: "patterns".to_string(),
            adr_dir: "adr".to_string(),
            resources_dir: "resources".to_string(),
        }
    }
}

impl ResourcePaths {
    /// Returns the base directory for a singular category name.
    ///
    /// Extension categories resolve under the generic resources directory.
    #[must_use]
    pub fn base_dir_for(&self, category: &str) -> String {
        match category {
            "guideline" => self.guidelines_dir.clone(),
            "pattern" => self.patterns_dir.clone(),
            "adr" => self.adr_dir.clone(),
            other => format!("{}/{other}", self.resources_dir),
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Cache section.
    pub cache: Option<ConfigFileCache>,
    /// Resources section.
    pub resources: Option<ConfigFileResources>,
}

/// Cache section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileCache {
    /// Maximum memory budget in bytes.
    pub max_memory_bytes: Option<usize>,
    /// Cleanup interval in seconds.
    pub cleanup_interval_secs: Option<u64>,
}

/// Resources section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileResources {
    /// Guidelines base directory.
    pub guidelines_dir: Option<String>,
    /// Patterns base directory.
    pub patterns_dir: Option<String>,
    /// ADR base directory.
    pub adr_dir: Option<String>,
    /// Extension categories base directory.
    pub resources_dir: Option<String>,
}

impl ArchdocConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &std::path::Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: e.to_string(),
            })?;

        let file: ConfigFile =
            toml::from_str(&contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/archdoc/` on macOS)
    /// 2. XDG config dir (`~/.config/archdoc/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let platform_config = base_dirs.config_dir().join("archdoc").join("config.toml");
        if platform_config.exists() {
            if let Ok(config) = Self::load_from_file(&platform_config) {
                return config;
            }
        }

        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("archdoc")
            .join("config.toml");
        if xdg_config.exists() {
            if let Ok(config) = Self::load_from_file(&xdg_config) {
                return config;
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `ArchdocConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(cache) = file.cache {
            if let Some(bytes) = cache.max_memory_bytes {
                config.cache.max_memory_bytes = bytes;
            }
            if let Some(secs) = cache.cleanup_interval_secs {
                config.cache.cleanup_interval = Duration::from_secs(secs);
            }
        }
        if let Some(resources) = file.resources {
            if let Some(dir) = resources.guidelines_dir {
                config.resources.guidelines_dir = dir;
            }
            if let Some(dir) = resources.patterns_dir {
                config.resources.patterns_dir = dir;
            }
            if let Some(dir) = resources.adr_dir {
                config.resources.adr_dir = dir;
            }
            if let Some(dir) = resources.resources_dir {
                config.resources.resources_dir = dir;
            }
        }

        config
    }

    /// Sets the maximum cache memory budget.
    #[must_use]
    pub const fn with_max_memory_bytes(mut self, bytes: usize) -> Self {
        self.cache.max_memory_bytes = bytes;
        self
    }

    /// Sets the background cleanup interval.
    #[must_use]
    pub const fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cache.cleanup_interval = interval;
        self
    }

    /// Sets the resource base directories.
    #[must_use]
    pub fn with_resource_paths(mut self, paths: ResourcePaths) -> Self {
        self.resources = paths;
        self
    }
}
