//! Config Command
//!
//! Manage SEOForge configuration.
//!
//! Usage:
//!   seoforge config show [--format json]
//!   seoforge config path
//!   seoforge config init [--global] [--force] [--base-url URL]

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, project_root};
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the effective configuration
pub fn show(ctx: &CommandContext) -> Result<()> {
    println!(
        "{}",
        ConfigLoader::render_config(&ctx.config, ctx.format.is_json())?
    );
    Ok(())
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Initialize global or project configuration
pub fn init(global: bool, force: bool, base_url: Option<&str>) -> Result<()> {
    let output = Output::new();
    if global {
        let path = ConfigLoader::init_global(force)?;
        output.success("Initialized global configuration");
        output.field("Config", path.display());
    } else {
        let path = ConfigLoader::init_project(&project_root(), base_url)?;
        output.success("Initialized project configuration");
        output.field("Config", path.display());
        if base_url.is_none() {
            output.info("Set site.base_url before generating pages");
        }
    }
    Ok(())
}
