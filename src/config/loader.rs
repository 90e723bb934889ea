//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/seoforge/config.toml)
//! 3. Project config (.seoforge/config.toml)
//! 4. Environment variables (SEOFORGE_* prefix, `__` between nested keys)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{Result, SeoError};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        // SEOFORGE_GOOGLE__BATCH_DELAY_MS -> google.batch_delay_ms
        figment = figment.merge(Self::env_provider());

        let config: Config = figment
            .extract()
            .map_err(|e| SeoError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only (plus defaults)
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(SeoError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| SeoError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    fn env_provider() -> Env {
        Env::prefixed("SEOFORGE_").split("__").lowercase(true)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/seoforge/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("seoforge"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    /// Get project data directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".seoforge")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Render the effective configuration as TOML or JSON
    pub fn render_config(config: &Config, as_json: bool) -> Result<String> {
        if as_json {
            Ok(serde_json::to_string_pretty(config)?)
        } else {
            toml::to_string_pretty(config).map_err(|e| SeoError::Config(e.to_string()))
        }
    }

    /// Show current effective configuration
    pub fn show_config(as_json: bool) -> Result<()> {
        let config = Self::load()?;
        println!("{}", Self::render_config(&config, as_json)?);
        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize global configuration
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            SeoError::Config("Cannot determine global config directory".to_string())
        })?;

        fs::create_dir_all(&global_dir)?;

        let config_path = global_dir.join("config.toml");
        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_global_config())?;
            info!("Created global config: {}", config_path.display());
        } else {
            info!("Global config exists: {}", config_path.display());
        }

        Ok(config_path)
    }

    /// Initialize project configuration in `root`
    pub fn init_project(root: &Path, base_url: Option<&str>) -> Result<PathBuf> {
        let project_dir = root.join(Self::project_dir());
        fs::create_dir_all(&project_dir)?;

        let config_path = project_dir.join("config.toml");
        if !config_path.exists() {
            fs::write(&config_path, Self::default_project_config(base_url))?;
            info!("Created project config: {}", config_path.display());
        }

        Ok(config_path)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn default_global_config() -> String {
        r#"# SEOForge Global Configuration
# User-wide defaults. Project settings in .seoforge/config.toml override these.

version = "1.0"

# Text generation
[llm]
provider = "anthropic"
# model = "claude-sonnet-4-20250514"
timeout_secs = 120
retry_attempts = 3
retry_base_delay_ms = 1000

# Google APIs (service account)
[google]
credentials_env = "GOOGLE_APPLICATION_CREDENTIALS_JSON"
# credentials_path = "/path/to/service-account.json"
timeout_secs = 30
"#
        .to_string()
    }

    fn default_project_config(base_url: Option<&str>) -> String {
        let base_url = base_url.unwrap_or("https://example.com");
        format!(
            r#"# SEOForge Project Configuration
# Project-specific settings that override global defaults.

version = "1.0"

[site]
base_url = "{}"
site_name = "My Site"
output_dir = "output"

[google]
indexing_enabled = false
feedback_enabled = false
# site_url = "sc-domain:example.com"
batch_delay_ms = 100
window_days = 28

[pipeline]
delay_between_units_ms = 1000
# deadline_secs = 3600

# Health classification thresholds
[feedback]
min_ctr = 0.02
attention_position = 10.0
underperforming_position = 20.0
high_impressions = 100
snippet_min_clicks = 5
low_traffic_clicks = 10
"#,
            base_url
        )
    }
}
