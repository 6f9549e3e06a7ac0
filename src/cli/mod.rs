pub mod analyze;
pub mod assess;
pub mod dataset;
pub mod doctor;
pub mod explain;
pub mod feedback;
pub mod review;
pub mod serve;

use anyhow::Result;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::level::StudentLevel;
use crate::llm::{factory, LlmClient};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

/// Load config (explicit path, ./codetutor.toml, or user config dir) and
/// apply the `--model` override.
pub fn load_config(config_path: Option<String>, model_override: Option<String>) -> Result<Config> {
    let mut config = Config::load_with_path(config_path)?;
    if let Some(model) = model_override {
        info!("CLI override: model = {}", model);
        config.llm.model = model;
    }
    Ok(config)
}

pub fn build_client(config: &Config, dry_run: bool) -> Result<Arc<dyn LlmClient>> {
    Ok(Arc::from(factory::create_client(config, dry_run)?))
}

/// `--level` if given, else the configured default.
pub fn resolve_level(level: Option<String>, config: &Config) -> Result<StudentLevel> {
    match level {
        Some(raw) => StudentLevel::from_str(&raw),
        None => Ok(config.feedback.default_level),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_level() {
        let config = Config::default();
        assert_eq!(resolve_level(None, &config).unwrap(), StudentLevel::Beginner);
        assert_eq!(
            resolve_level(Some("advanced".to_string()), &config).unwrap(),
            StudentLevel::Advanced
        );
        assert!(resolve_level(Some("guru".to_string()), &config).is_err());
    }

    #[test]
    fn test_load_config_with_model_override() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("codetutor.toml");
        std::fs::write(&path, "[llm]\nmodel = \"from-file\"\n").unwrap();

        let config = load_config(
            Some(path.to_string_lossy().into_owned()),
            Some("from-cli".to_string()),
        )
        .unwrap();
        assert_eq!(config.llm.model, "from-cli");
    }
}
