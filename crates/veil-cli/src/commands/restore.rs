use anyhow::{Context, Result};
use std::path::Path;

use veil_config::Config;
use veil_engine::DesanitizationEngine;

use crate::cli::GateArgs;

pub async fn handle(
    config: &Config,
    original: &Path,
    response: &str,
    gates: GateArgs,
) -> Result<()> {
    let original = tokio::fs::read_to_string(original)
        .await
        .with_context(|| format!("Failed to read {}", original.display()))?;
    let response = super::read_input(response).await?;

    print!("{}", restore(config, &original, &response, gates)?);
    Ok(())
}

/// Rebuild the mapping by sanitizing `original` into a fresh session, then
/// desanitize `response` against it. Same text and settings give the same
/// aliases, so nothing has to be persisted between the two commands.
///
/// Fails if any pattern was skipped during the rebuild: aliases minted from
/// a partial run can name different values than the ones the user saw.
pub fn restore(
    config: &Config,
    original: &str,
    response: &str,
    gates: GateArgs,
) -> Result<String> {
    let engine = super::build_engine(config)?;
    let session = super::new_session(config);
    let options = super::effective_options(config, gates);

    let replay = engine.sanitize(original, &options, &session)?;
    if replay.is_degraded() {
        session.dispose();
        anyhow::bail!(
            "Patterns skipped while rebuilding aliases ({}); the mapping may not match the \
             sanitized text. Raise [patterns] timeout_ms or fix the patterns and retry",
            replay.skipped_patterns.join(", ")
        );
    }
    tracing::debug!(
        session = session.id(),
        aliases = session.len(),
        matches = replay.matches.len(),
        "Rebuilt session from original"
    );

    let restored = DesanitizationEngine::new().desanitize(response, &session);
    session.dispose();
    Ok(restored)
}
