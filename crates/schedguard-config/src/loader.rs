//! Layered configuration loading, modeled on `kimberlite-config`'s
//! `ConfigLoader`: defaults, then a project file, then environment
//! variables, in ascending precedence.

use std::env;
use std::path::PathBuf;

use crate::{ConfigError, SchedguardConfig};

pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    file_name: String,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "SCHEDGUARD".to_string(),
            file_name: "schedguard.toml".to_string(),
        }
    }

    pub fn with_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = dir.into();
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    fn config_file(&self) -> PathBuf {
        self.project_dir.join(&self.file_name)
    }

    pub fn load(self) -> Result<SchedguardConfig, ConfigError> {
        let mut builder = config::Config::builder();

        let defaults = SchedguardConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        let project_file = self.config_file();
        if project_file.exists() {
            builder = builder.add_source(
                config::File::from(project_file).required(false).format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .separator("_")
                .try_parsing(true),
        );

        let built = builder.build()?;
        let loaded: SchedguardConfig = built.try_deserialize()?;
        loaded.timing.validate()?;

        Ok(loaded)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn loads_defaults_with_no_file() {
        let temp = TempDir::new().unwrap();
        let config = ConfigLoader::new()
            .with_project_dir(temp.path())
            .load()
            .unwrap();
        assert_eq!(config.store.address, "127.0.0.1:5432");
    }

    #[test]
    fn project_file_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("schedguard.toml"),
            r#"
[store]
address = "db.internal:5432"
database = "airflow"
user = "scheduler"

[timing]
time_between_checkins_secs = 5
grace_period_secs = 20
patience_secs = 8
"#,
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_project_dir(temp.path())
            .load()
            .unwrap();

        assert_eq!(config.store.address, "db.internal:5432");
        assert_eq!(config.store.database, "airflow");
        assert_eq!(config.timing.grace_period().as_secs(), 20);
    }

    #[test]
    fn invalid_timing_is_rejected_at_load_time() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("schedguard.toml"),
            r#"
[timing]
time_between_checkins_secs = 30
grace_period_secs = 10
patience_secs = 5
"#,
        )
        .unwrap();

        let result = ConfigLoader::new().with_project_dir(temp.path()).load();
        assert!(matches!(result, Err(ConfigError::GraceTooShort { .. })));
    }
}
