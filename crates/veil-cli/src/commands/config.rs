use anyhow::Result;
use std::path::Path;

use veil_config::Config;

pub fn handle(path: Option<&Path>) -> Result<()> {
    let (path, config) = match path {
        Some(path) => (path.to_path_buf(), Config::load_from(path)?),
        None => (Config::config_path(), Config::load()?),
    };

    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
