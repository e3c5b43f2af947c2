//! Sync command - pushes page records to the search index

use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use color_eyre::eyre::{Result, WrapErr};
use sitesearch_core::Config;
use sitesearch_index::{AlgoliaIndex, DryRunIndex, SearchIndex};
use sitesearch_records::HtmlRecordExtractor;
use sitesearch_sync::{ArtifactLocator, SyncOptions, SyncReport, Synchronizer};

/// Command-line settings layered over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub dry_run: bool,
    pub skip_on_error: bool,
    pub content_dir: Option<PathBuf>,
    pub pages_dir: Option<PathBuf>,
    pub base_url: Option<String>,
}

impl Overrides {
    /// Apply the overrides to a loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if self.skip_on_error {
            config.sync.skip_on_error = true;
        }

        if let Some(dir) = &self.content_dir {
            tracing::info!(content_dir = %dir.display(), "Overriding content directory from CLI");
            config.site.content_dir = dir.to_string_lossy().to_string();
        }

        if let Some(dir) = &self.pages_dir {
            tracing::info!(pages_dir = %dir.display(), "Overriding pages directory from CLI");
            config.site.pages_dir = dir.to_string_lossy().to_string();
        }

        if let Some(url) = &self.base_url {
            tracing::info!(base_url = %url, "Overriding base URL from CLI");
            config.site.base_url = url.clone();
        }
    }
}

/// Run the sync command.
///
/// Collects documents, generates records from the rendered pages and makes
/// the remote index match them.
pub async fn run(config_path: &Path, overrides: &Overrides) -> Result<()> {
    let start = Instant::now();
    tracing::info!(?config_path, ?overrides, "Starting sync");

    let mut config = Config::read(config_path).wrap_err("Failed to load configuration")?;
    overrides.apply(&mut config);
    config.validate().wrap_err("Invalid configuration")?;

    tracing::debug!(?config, "Loaded configuration");

    let generator = HtmlRecordExtractor::from_config(&config);
    let locator = ArtifactLocator::new(&config.site.pages_dir);
    let options = SyncOptions::from_config(&config);
    let index =
        AlgoliaIndex::from_config(&config.index).wrap_err("Failed to create index client")?;

    let content_dir = Path::new(&config.site.content_dir);
    let report = if overrides.dry_run {
        sync_with(generator, DryRunIndex::new(index), locator, options, content_dir).await
    } else {
        sync_with(generator, index, locator, options, content_dir).await
    }?;

    print_report(&report, &config);

    tracing::info!(duration = ?start.elapsed(), "Sync completed");

    Ok(())
}

async fn sync_with<I: SearchIndex>(
    generator: HtmlRecordExtractor,
    index: I,
    locator: ArtifactLocator,
    options: SyncOptions,
    content_dir: &Path,
) -> Result<SyncReport> {
    Synchronizer::new(generator, index, locator)
        .with_options(options)
        .sync(content_dir)
        .await
        .wrap_err("Sync failed")
}

fn print_report(report: &SyncReport, config: &Config) {
    println!();
    if report.dry_run {
        println!("  Dry run completed, the index was not modified.");
    } else {
        println!("  Sync completed successfully!");
    }
    println!();
    println!("  Index:      {}", config.index.index_name);
    println!("  Documents:  {}", report.documents_seen);
    println!(
        "  Filtered:   {} (draft {}, noindex {}, untitled {})",
        report.filtered.total(),
        report.filtered.draft,
        report.filtered.noindex,
        report.filtered.untitled
    );
    println!("  Processed:  {}", report.processed);
    println!("  Records:    {}", report.records_uploaded);
    println!("  Deleted:    {}", report.deleted_ids.len());

    if !report.failed.is_empty() {
        println!();
        println!("  Skipped documents:");
        for failed in &report.failed {
            println!("  ⚠ {}: {}", failed.slug, failed.message);
        }
    }

    println!();
    println!("  Duration:   {:.2}s", report.duration.as_secs_f64());
    println!();
}
