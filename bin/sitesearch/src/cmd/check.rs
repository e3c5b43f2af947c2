//! Check command - validate configuration and content

use std::path::Path;

use color_eyre::eyre::{Result, bail};
use sitesearch_core::Config;
use sitesearch_records::{HtmlRecordExtractor, RecordGenerator};
use sitesearch_sync::{ArtifactLocator, DocumentCollector, partition};

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// What a sync would work on.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ContentSummary {
    pub documents: usize,
    pub eligible: usize,
    pub filtered: usize,
    pub missing_artifacts: usize,
    pub records: usize,
}

/// Run the check command.
///
/// Validates configuration, documents and rendered pages. Never contacts the index.
pub fn run(config_path: &Path, strict: bool) -> Result<()> {
    tracing::info!(?config_path, strict, "Checking configuration and content");

    let mut result = ValidationResult::default();

    println!("Checking configuration...");
    let config = match Config::read(config_path) {
        Ok(config) => {
            match config.validate() {
                Ok(()) => println!("  ✓ Configuration valid"),
                Err(e) => {
                    result.add_error(format!("Configuration error: {e}"));
                    println!("  ✗ Configuration invalid: {e}");
                }
            }
            Some(config)
        }
        Err(e) => {
            result.add_error(format!("Configuration error: {e}"));
            println!("  ✗ Configuration could not be read: {e}");
            None
        }
    };

    if let Some(ref config) = config {
        println!("\nChecking documents and pages...");
        let summary = check_content(config, &mut result);
        println!("  ℹ Documents: {}", summary.documents);
        println!(
            "  ℹ Indexable: {} ({} filtered)",
            summary.eligible, summary.filtered
        );
        println!("  ℹ Records:   {}", summary.records);
        if summary.missing_artifacts == 0 {
            println!("  ✓ Every indexable document has a rendered page");
        } else {
            println!(
                "  ⚠ {} document(s) without a rendered page",
                summary.missing_artifacts
            );
        }
    }

    println!();
    println!("Summary:");
    println!("  Errors:   {}", result.errors.len());
    println!("  Warnings: {}", result.warnings.len());

    if result.has_errors() {
        println!();
        println!("Errors:");
        for err in &result.errors {
            println!("  ✗ {err}");
        }
    }

    if result.has_warnings() {
        println!();
        println!("Warnings:");
        for warn in &result.warnings {
            println!("  ⚠ {warn}");
        }
    }

    if result.has_errors() {
        bail!("Validation failed with {} error(s)", result.errors.len());
    }

    if strict && result.has_warnings() {
        bail!(
            "Validation failed with {} warning(s) (strict mode)",
            result.warnings.len()
        );
    }

    println!();
    println!("✓ All checks passed");

    Ok(())
}

/// Collect documents and run record generation over every rendered page.
///
/// Missing pages and extraction failures are warnings; an unreadable content
/// directory is an error. Unparseable source files are errors unless
/// `sync.skip_on_error` is set, matching what a sync would do with them.
pub fn check_content(config: &Config, result: &mut ValidationResult) -> ContentSummary {
    let mut summary = ContentSummary::default();

    let collection = match DocumentCollector::new(&config.site.content_dir)
        .skip_unparseable(true)
        .collect()
    {
        Ok(collection) => collection,
        Err(e) => {
            result.add_error(format!("Content error: {e}"));
            return summary;
        }
    };

    for skipped in &collection.skipped {
        let message = format!("{}: {}", skipped.path.display(), skipped.message);
        if config.sync.skip_on_error {
            result.add_warning(message);
        } else {
            result.add_error(message);
        }
    }

    let documents = collection.documents;
    summary.documents = documents.len();

    let (eligible, filtered) = partition(&documents);
    summary.eligible = eligible.len();
    summary.filtered = filtered.total();

    if eligible.is_empty() {
        result.add_warning("No indexable documents, a sync would empty the index");
    }

    let locator = ArtifactLocator::new(&config.site.pages_dir);
    let extractor = HtmlRecordExtractor::from_config(config);

    for document in eligible {
        match locator.read(&document.slug) {
            Ok(html) => match extractor.generate(&html, document) {
                Ok(records) => summary.records += records.len(),
                Err(e) => result.add_warning(format!("{}: {e}", document.slug)),
            },
            Err(e) => {
                summary.missing_artifacts += 1;
                result.add_warning(e.to_string());
            }
        }
    }

    summary
}
