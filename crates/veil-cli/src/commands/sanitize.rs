use anyhow::Result;
use serde::Serialize;

use veil_config::Config;
use veil_core::SanitizationResult;

use crate::cli::GateArgs;

#[derive(Serialize)]
struct SanitizeOutput<'a> {
    session_id: &'a str,
    #[serde(flatten)]
    result: &'a SanitizationResult,
}

pub async fn handle(config: &Config, input: &str, json: bool, gates: GateArgs) -> Result<()> {
    let content = super::read_input(input).await?;
    let engine = super::build_engine(config)?;
    let session = super::new_session(config);
    let options = super::effective_options(config, gates);

    let result = engine.sanitize(&content, &options, &session)?;

    if result.is_degraded() {
        eprintln!(
            "Warning: patterns skipped, output may still contain sensitive values: {}",
            result.skipped_patterns.join(", ")
        );
    }
    if !result.ambiguous_aliases.is_empty() {
        eprintln!(
            "Warning: input already contains aliases that restore will replace: {}",
            result.ambiguous_aliases.join(", ")
        );
    }

    if json {
        let output = SanitizeOutput {
            session_id: session.id(),
            result: &result,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", result.sanitized_content);
    }

    Ok(())
}
