//! CLI Common Utilities
//!
//! Shared initialization for command handlers.

use std::path::{Path, PathBuf};

use tokio::runtime::Runtime;
use tracing::warn;

use crate::config::{Config, ConfigLoader};
use crate::types::{CancelSignal, Result, SeoError};

/// Output format for reporting commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        self == OutputFormat::Json
    }
}

/// Command execution context
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: Config,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Load the merged configuration, or only `config_path` when given
    pub fn load(config_path: Option<&Path>, format: OutputFormat) -> Result<Self> {
        let config = match config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load()?,
        };
        Ok(Self { config, format })
    }
}

/// Runtime for one command
pub fn runtime() -> Result<Runtime> {
    Runtime::new().map_err(SeoError::Io)
}

/// Cancel signal tripped by Ctrl-C
///
/// Must be called from inside the runtime.
pub fn cancel_on_ctrl_c(cancel: CancelSignal) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight work");
            cancel.cancel();
        }
    });
}

/// Read a JSON array from `path`
pub fn read_json_list<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        SeoError::InvalidInput(format!("Cannot read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content)
        .map_err(|e| SeoError::InvalidInput(format!("Invalid JSON in {}: {}", path.display(), e)))
}

/// Current directory, falling back to `.`
pub fn project_root() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::GenerationUnit;
    use tempfile::TempDir;

    #[test]
    fn test_read_units_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("units.json");
        std::fs::write(
            &path,
            r#"[{"label": "Bakery", "audience": "owners", "painPoint": "slow mornings"}]"#,
        )
        .unwrap();

        let units: Vec<GenerationUnit> = read_json_list(&path).unwrap();
        assert_eq!(units[0].label, "Bakery");

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            read_json_list::<GenerationUnit>(&path).unwrap_err(),
            SeoError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_context_from_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = ConfigLoader::init_project(dir.path(), Some("https://shop.test")).unwrap();
        let ctx = CommandContext::load(Some(&path), OutputFormat::Json).unwrap();
        assert_eq!(ctx.config.site.base_url, "https://shop.test");
        assert!(ctx.format.is_json());
    }
}
