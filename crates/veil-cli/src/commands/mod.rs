pub mod completions;
pub mod config;
pub mod patterns;
pub mod restore;
pub mod sanitize;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

use veil_config::Config;
use veil_core::SanitizationOptions;
use veil_engine::SanitizationEngine;
use veil_security::MappingSession;

use crate::cli::GateArgs;

/// Explicit file if given, otherwise the default location (created on first use)
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Read a file, or stdin when `source` is `-`
pub async fn read_input(source: &str) -> Result<String> {
    if source == "-" {
        let mut content = String::new();
        tokio::io::stdin()
            .read_to_string(&mut content)
            .await
            .context("Failed to read stdin")?;
        Ok(content)
    } else {
        tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("Failed to read {}", source))
    }
}

/// Config options with command-line gates applied on top
pub fn effective_options(config: &Config, gates: GateArgs) -> SanitizationOptions {
    let mut options = config.sanitization_options();
    if gates.no_pii {
        options.enable_pii = false;
    }
    if gates.no_infra {
        options.enable_infrastructure = false;
    }
    if gates.no_custom {
        options.enable_custom_patterns = false;
    }
    options
}

pub fn build_engine(config: &Config) -> Result<SanitizationEngine> {
    let registry = config.build_registry()?;
    Ok(SanitizationEngine::new(Arc::new(registry)))
}

pub fn new_session(config: &Config) -> MappingSession {
    MappingSession::with_duration(config.session_duration())
}
