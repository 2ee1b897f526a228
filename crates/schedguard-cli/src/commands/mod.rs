//! CLI command implementations.

pub mod config;
pub mod coordinator;
pub mod observer;

/// `dir` is the directory containing `schedguard.toml` (the loader's fixed
/// file name), not the file path itself — matching `ConfigLoader`'s
/// project-dir model.
fn load_config(dir: Option<String>) -> anyhow::Result<schedguard_config::SchedguardConfig> {
    let config = match dir {
        Some(dir) => schedguard_config::SchedguardConfig::load_from_dir(dir)?,
        None => schedguard_config::SchedguardConfig::load()?,
    };
    Ok(config)
}
