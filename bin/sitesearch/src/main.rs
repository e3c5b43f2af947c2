//! sitesearch CLI
//!
//! Pushes the pages of a rendered documentation site into a hosted search index.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;
use sitesearch::cmd::sync::Overrides;

/// Command-line interface for sitesearch.
#[derive(Parser)]
#[command(
    name = "sitesearch",
    version,
    about = "Keep a hosted search index in sync with a documentation site"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "sitesearch.toml")]
    config: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Upload records for all pages and delete stale ones
    Sync {
        /// Compute the upload and deletions without writing to the index
        #[arg(long)]
        dry_run: bool,
        /// Skip pages that fail instead of aborting
        #[arg(long)]
        skip_on_error: bool,
        /// Override the documentation sources directory
        #[arg(long)]
        content_dir: Option<PathBuf>,
        /// Override the rendered pages directory
        #[arg(long)]
        pages_dir: Option<PathBuf>,
        /// Override the public site URL (e.g., https://docs.example.com)
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Validate configuration and content without contacting the index
    Check {
        /// Treat warnings (such as missing pages) as errors
        #[arg(long)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    sitesearch::init_tracing(cli.verbose);

    match cli.command {
        Commands::Sync {
            dry_run,
            skip_on_error,
            content_dir,
            pages_dir,
            base_url,
        } => {
            let overrides = Overrides {
                dry_run,
                skip_on_error,
                content_dir,
                pages_dir,
                base_url,
            };
            sitesearch::cmd::sync::run(&cli.config, &overrides).await?;
        }
        Commands::Check { strict } => {
            sitesearch::cmd::check::run(&cli.config, strict)?;
        }
    }

    Ok(())
}
