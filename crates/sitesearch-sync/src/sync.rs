//! Synchronization driver.
//!
//! One run makes the remote index hold exactly the records produced from the
//! current documents:
//!
//! 1. drop drafts, no-index pages and untitled pages
//! 2. read every remaining page and generate its records (in parallel)
//! 3. save all records in one bulk upload
//! 4. list the IDs stored remotely and delete those not just uploaded

use std::{
    collections::BTreeSet,
    path::Path,
    time::{Duration, Instant},
};

use rayon::prelude::*;
use sitesearch_core::{Config, DocumentDescriptor, SkipReason};
use sitesearch_index::{SaveOptions, SearchIndex};
use sitesearch_records::{RecordGenerator, SearchRecord};
use tracing::{debug, info, warn};

use crate::{
    artifact::ArtifactLocator,
    collector::DocumentCollector,
    error::{DocumentError, Result, SyncError},
};

/// Run policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Log and skip failing documents instead of aborting the run.
    pub skip_on_error: bool,

    /// Let the index assign IDs to records that carry none.
    pub auto_generate_object_ids: bool,
}

impl SyncOptions {
    /// Options from the `[sync]` and `[records]` sections.
    pub fn from_config(config: &Config) -> Self {
        Self {
            skip_on_error: config.sync.skip_on_error,
            auto_generate_object_ids: !config.records.stable_ids,
        }
    }
}

/// Documents left out of a run, by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterCounts {
    pub draft: usize,
    pub noindex: usize,
    pub untitled: usize,
}

impl FilterCounts {
    fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::Draft => self.draft += 1,
            SkipReason::NoIndex => self.noindex += 1,
            SkipReason::Untitled => self.untitled += 1,
        }
    }

    /// Total filtered documents.
    pub fn total(&self) -> usize {
        self.draft + self.noindex + self.untitled
    }
}

/// A document skipped because of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDocument {
    pub slug: String,
    pub message: String,
}

/// Outcome of a synchronization run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Documents handed to the run, unparseable source files included.
    pub documents_seen: usize,

    /// Documents filtered out before processing.
    pub filtered: FilterCounts,

    /// Documents that produced records.
    pub processed: usize,

    /// Documents skipped because of an error.
    pub failed: Vec<FailedDocument>,

    /// Records saved to the index.
    pub records_uploaded: usize,

    /// Stale IDs removed from the index.
    pub deleted_ids: Vec<String>,

    /// Whether writes were only simulated.
    pub dry_run: bool,

    /// Wall-clock duration of the run.
    pub duration: Duration,
}

/// Split documents into the indexable ones and counts of the rest.
pub fn partition(documents: &[DocumentDescriptor]) -> (Vec<&DocumentDescriptor>, FilterCounts) {
    let mut counts = FilterCounts::default();
    let eligible = documents
        .iter()
        .filter(|document| match document.skip_reason() {
            Some(reason) => {
                debug!(slug = %document.slug, %reason, "skipping document");
                counts.record(reason);
                false
            }
            None => true,
        })
        .collect();
    (eligible, counts)
}

/// Drives a full synchronization run.
#[derive(Debug)]
pub struct Synchronizer<G, I> {
    generator: G,
    index: I,
    locator: ArtifactLocator,
    options: SyncOptions,
}

impl<G: RecordGenerator, I: SearchIndex> Synchronizer<G, I> {
    /// Create a synchronizer with default options.
    #[must_use]
    pub fn new(generator: G, index: I, locator: ArtifactLocator) -> Self {
        Self {
            generator,
            index,
            locator,
            options: SyncOptions::default(),
        }
    }

    /// Set the run policy.
    #[must_use]
    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> SyncOptions {
        self.options
    }

    /// The target index.
    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Collect the documents under `content_dir` and synchronize the index with them.
    ///
    /// Source files that cannot be parsed follow the same policy as failing
    /// documents: they abort the run, or are reported in [`SyncReport::failed`]
    /// when errors are skipped.
    pub async fn sync(&self, content_dir: &Path) -> Result<SyncReport> {
        let collection = DocumentCollector::new(content_dir)
            .skip_unparseable(self.options.skip_on_error)
            .collect()?;

        let failed = collection
            .skipped
            .into_iter()
            .map(|file| FailedDocument {
                slug: file.slug,
                message: file.message,
            })
            .collect();

        self.execute(&collection.documents, failed).await
    }

    /// Synchronize the index with `documents`.
    ///
    /// Every document failure is resolved before the first remote call, so an
    /// aborted run leaves the index untouched.
    pub async fn run(&self, documents: &[DocumentDescriptor]) -> Result<SyncReport> {
        self.execute(documents, Vec::new()).await
    }

    async fn execute(
        &self,
        documents: &[DocumentDescriptor],
        failed: Vec<FailedDocument>,
    ) -> Result<SyncReport> {
        let start = Instant::now();
        let mut report = SyncReport {
            documents_seen: documents.len() + failed.len(),
            failed,
            dry_run: self.index.is_dry_run(),
            ..Default::default()
        };

        info!(
            documents = documents.len(),
            index = %self.index.index_name(),
            dry_run = report.dry_run,
            "starting sync"
        );

        let (eligible, filtered) = partition(documents);
        report.filtered = filtered;

        let records = self.generate_all(&eligible, &mut report)?;

        if records.is_empty() {
            warn!("no records produced, every stored record will be deleted");
        }

        let options = SaveOptions {
            auto_generate_object_ids: self.options.auto_generate_object_ids,
        };
        let uploaded = self.index.save_records(&records, options).await?;
        report.records_uploaded = uploaded.len();

        let existing = self.index.list_object_ids().await?;
        let stale = stale_ids(existing, &uploaded);
        let deleted = self.index.delete_records(&stale).await?;
        debug!(requested = stale.len(), deleted, "removed stale records");
        report.deleted_ids = stale;

        report.duration = start.elapsed();

        info!(
            processed = report.processed,
            failed = report.failed.len(),
            filtered = report.filtered.total(),
            uploaded = report.records_uploaded,
            deleted = report.deleted_ids.len(),
            duration_ms = report.duration.as_millis() as u64,
            "sync complete"
        );

        Ok(report)
    }

    /// Generate records for all eligible documents, in document order.
    fn generate_all(
        &self,
        eligible: &[&DocumentDescriptor],
        report: &mut SyncReport,
    ) -> Result<Vec<SearchRecord>> {
        let outcomes: Vec<_> = eligible
            .par_iter()
            .map(|document| self.process(document))
            .collect();

        let mut records = Vec::new();
        for (document, outcome) in eligible.iter().zip(outcomes) {
            match outcome {
                Ok(mut produced) => {
                    debug!(slug = %document.slug, records = produced.len(), "processed document");
                    report.processed += 1;
                    records.append(&mut produced);
                }
                Err(source) if self.options.skip_on_error => {
                    warn!(slug = %document.slug, error = %source, "skipping failed document");
                    report.failed.push(FailedDocument {
                        slug: document.slug.clone(),
                        message: source.to_string(),
                    });
                }
                Err(source) => {
                    return Err(SyncError::Document {
                        slug: document.slug.clone(),
                        source,
                    });
                }
            }
        }

        Ok(records)
    }

    fn process(&self, document: &DocumentDescriptor) -> std::result::Result<Vec<SearchRecord>, DocumentError> {
        let html = self.locator.read(&document.slug)?;
        Ok(self.generator.generate(&html, document)?)
    }
}

/// IDs present remotely that were not part of the upload.
pub fn stale_ids(existing: BTreeSet<String>, uploaded: &[String]) -> Vec<String> {
    let uploaded: BTreeSet<&str> = uploaded.iter().map(String::as_str).collect();
    existing
        .into_iter()
        .filter(|id| !uploaded.contains(id.as_str()))
        .collect()
}
