use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use veil_core::{Category, Pattern, SanitizationOptions};
use veil_security::{BUILTIN_PATTERNS, PatternRegistry};

/// Configuration for veil
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sanitize: SanitizationOptions,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub patterns: PatternsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternsConfig {
    /// Per-pattern match budget
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Built-in pattern names to turn off
    #[serde(default)]
    pub disabled: Vec<String>,

    #[serde(default)]
    pub custom: Vec<CustomPattern>,
}

/// User-defined detector. A name matching a built-in replaces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomPattern {
    pub name: String,
    pub regex: String,

    /// Category name; anything unrecognised is treated as `custom`
    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default)]
    pub priority: i32,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_minutes: default_duration_minutes(),
        }
    }
}

impl Default for PatternsConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            disabled: Vec::new(),
            custom: Vec::new(),
        }
    }
}

fn default_duration_minutes() -> u64 {
    60
}

fn default_timeout_ms() -> u64 {
    100
}

fn default_category() -> String {
    "custom".to_string()
}

fn default_enabled() -> bool {
    true
}

impl CustomPattern {
    pub fn category(&self) -> Category {
        self.category.parse().unwrap_or(Category::Custom)
    }
}

impl Config {
    /// Load config from default location or create default if not found
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path();

        if path.exists() {
            Self::load_from(&path)
        } else {
            // Create default config file
            let config = Config::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let content = toml::to_string_pretty(&config)?;
            std::fs::write(&path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::debug!(path = %path.display(), "Wrote default config");
            Ok(config)
        }
    }

    /// Load config from an explicit file
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Get config file path
    pub fn config_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("com", "veil", "veil") {
            dirs.config_dir().join("config.toml")
        } else {
            PathBuf::from("~/.veil/config.toml")
        }
    }

    pub fn sanitization_options(&self) -> SanitizationOptions {
        self.sanitize.clone()
    }

    pub fn session_duration(&self) -> Duration {
        Duration::from_secs(self.session.duration_minutes.saturating_mul(60))
    }

    pub fn match_timeout(&self) -> Duration {
        Duration::from_millis(self.patterns.timeout_ms)
    }

    /// Built-ins minus `disabled`, plus custom patterns, all on the configured timeout.
    pub fn build_registry(&self) -> anyhow::Result<PatternRegistry> {
        let timeout = self.match_timeout();
        let registry = PatternRegistry::new();

        for unknown in self
            .patterns
            .disabled
            .iter()
            .filter(|name| !BUILTIN_PATTERNS.iter().any(|b| b.name == name.as_str()))
        {
            tracing::warn!(pattern = %unknown, "Disabled pattern is not a built-in");
        }

        for builtin in BUILTIN_PATTERNS {
            let off = self.patterns.disabled.iter().any(|n| n == builtin.name);
            let pattern = builtin.build()?.with_timeout(timeout);
            let enabled = pattern.is_enabled() && !off;
            registry.add(pattern.with_enabled(enabled));
        }

        for custom in &self.patterns.custom {
            let pattern = Pattern::new(&custom.name, &custom.regex, custom.category())
                .with_context(|| format!("Invalid custom pattern '{}'", custom.name))?
                .with_priority(custom.priority)
                .with_enabled(custom.enabled)
                .with_timeout(timeout);
            registry.add(pattern);
        }

        Ok(registry)
    }
}
