use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seoforge::cli::commands;
use seoforge::cli::util::{CommandContext, OutputFormat};
use seoforge::constants::google::DEFAULT_WINDOW_DAYS;
use seoforge::pipeline::SetupOptions;

#[derive(Parser)]
#[command(name = "seoforge")]
#[command(
    version,
    about = "Generate landing pages, get them indexed and track how they perform"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Load only this config file instead of the global/project layers
    #[arg(long, short, global = true, env = "SEOFORGE_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,

    #[arg(long, short = 'f', global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate landing pages from a JSON list of units
    Generate {
        #[arg(long, short, help = "JSON file with an array of units")]
        units: PathBuf,
        #[arg(long, help = "Use built-in fixture responses instead of an LLM")]
        offline: bool,
        #[arg(long, help = "Submit generated pages for indexing")]
        index: bool,
    },

    /// Request indexing for URLs
    Index {
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Notify Google that a URL was removed
    Remove { url: String },

    /// Show the latest indexing notifications for a URL
    UrlStatus { url: String },

    /// Inspect a URL in Search Console
    Inspect { url: String },

    /// Classify page health from search metrics
    Analyze {
        #[arg(help = "Pages to analyze (default: every generated page)")]
        urls: Vec<String>,
    },

    /// Site-wide search performance
    Summary {
        #[arg(long, short, default_value_t = DEFAULT_WINDOW_DAYS)]
        days: u32,
    },

    /// List Search Console properties
    Sites,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show,
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
        #[arg(long, help = "Site base URL for the project config")]
        base_url: Option<String>,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mSEOForge encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Config commands work without a loadable configuration
    if let Commands::Config {
        action: ConfigAction::Path,
    } = &cli.command
    {
        return Ok(commands::config::path()?);
    }
    if let Commands::Config {
        action:
            ConfigAction::Init {
                global,
                force,
                base_url,
            },
    } = &cli.command
    {
        return Ok(commands::config::init(*global, *force, base_url.as_deref())?);
    }

    let ctx = CommandContext::load(cli.config.as_deref(), cli.format)?;

    match cli.command {
        Commands::Generate {
            units,
            offline,
            index,
        } => {
            commands::generate::run(&ctx, &units, SetupOptions { offline, index })?;
        }
        Commands::Index { urls } => commands::index::index(&ctx, &urls)?,
        Commands::Remove { url } => commands::index::remove(&ctx, &url)?,
        Commands::UrlStatus { url } => commands::index::url_status(&ctx, &url)?,
        Commands::Inspect { url } => commands::search::inspect(&ctx, &url)?,
        Commands::Analyze { urls } => commands::search::analyze(&ctx, &urls)?,
        Commands::Summary { days } => commands::search::summary(&ctx, days)?,
        Commands::Sites => commands::search::sites(&ctx)?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&ctx)?,
            ConfigAction::Path | ConfigAction::Init { .. } => {}
        },
    }

    Ok(())
}
