//! Dry-run wrapper: reads hit the wrapped index, writes are only recorded.

use std::{
    collections::BTreeSet,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use sitesearch_records::SearchRecord;
use tracing::info;

use crate::{Result, SaveOptions, SearchIndex, validate_records};

/// Writes a dry run would have performed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DryRunLog {
    /// IDs that would have been saved. Records without an ID get a `dry-run-{n}` placeholder.
    pub saved: Vec<String>,
    /// IDs that would have been deleted.
    pub deleted: Vec<String>,
}

/// Wraps an index so that saves and deletes never reach it.
#[derive(Debug)]
pub struct DryRunIndex<I> {
    inner: I,
    log: Mutex<DryRunLog>,
}

impl<I: SearchIndex> DryRunIndex<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            log: Mutex::default(),
        }
    }

    /// The wrapped index.
    pub fn inner(&self) -> &I {
        &self.inner
    }

    /// Snapshot of the writes recorded so far.
    pub fn log(&self) -> DryRunLog {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, DryRunLog> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl<I: SearchIndex> SearchIndex for DryRunIndex<I> {
    fn index_name(&self) -> &str {
        self.inner.index_name()
    }

    fn is_dry_run(&self) -> bool {
        true
    }

    async fn save_records(
        &self,
        records: &[SearchRecord],
        options: SaveOptions,
    ) -> Result<Vec<String>> {
        validate_records(records, options)?;

        let mut log = self.lock();
        let mut placeholder = log.saved.len();
        let ids: Vec<String> = records
            .iter()
            .map(|record| {
                record.object_id.clone().unwrap_or_else(|| {
                    placeholder += 1;
                    format!("dry-run-{placeholder}")
                })
            })
            .collect();
        log.saved.extend(ids.iter().cloned());

        info!(index = %self.index_name(), count = ids.len(), "Dry run: skipping save");
        Ok(ids)
    }

    async fn list_object_ids(&self) -> Result<BTreeSet<String>> {
        self.inner.list_object_ids().await
    }

    async fn delete_records(&self, object_ids: &[String]) -> Result<usize> {
        if object_ids.is_empty() {
            return Ok(0);
        }

        self.lock().deleted.extend(object_ids.iter().cloned());
        info!(index = %self.index_name(), count = object_ids.len(), "Dry run: skipping delete");
        Ok(object_ids.len())
    }
}
