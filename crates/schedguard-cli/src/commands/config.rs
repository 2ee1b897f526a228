//! `schedguard config show` - prints the effective, fully-layered config.

use anyhow::{Context, Result};

use super::load_config;

pub fn show(config_dir: Option<String>) -> Result<()> {
    let config = load_config(config_dir)?;
    let rendered = toml::to_string_pretty(&config).context("failed to render configuration")?;
    println!("{rendered}");
    Ok(())
}
