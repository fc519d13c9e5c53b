use anyhow::{Result, anyhow};
use std::cmp::Reverse;

use veil_config::Config;
use veil_core::Category;

pub fn handle(config: &Config, category: Option<&str>) -> Result<()> {
    let category = category
        .map(|name| name.parse::<Category>().map_err(|e| anyhow!(e)))
        .transpose()?;

    let registry = config.build_registry()?;
    let mut patterns = registry.get_patterns(category);
    patterns.sort_by_key(|p| Reverse(p.priority()));

    if patterns.is_empty() {
        println!("No enabled patterns.");
        return Ok(());
    }

    println!("{:>8}  {:<24}  {:<18}  {}", "PRIORITY", "NAME", "CATEGORY", "ALIAS");
    for pattern in patterns {
        println!(
            "{:>8}  {:<24}  {:<18}  {}N",
            pattern.priority(),
            pattern.name(),
            pattern.category(),
            pattern.category().alias_prefix()
        );
    }

    Ok(())
}
