//! In-process index.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use serde_json::Value;
use sitesearch_records::SearchRecord;
use tracing::debug;

use crate::{IndexError, Result, SaveOptions, SearchIndex, validate_records};

/// An index operation, used to inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Save,
    List,
    Delete,
}

/// How many times each operation was invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub save: usize,
    pub list: usize,
    pub delete: usize,
}

#[derive(Debug, Default)]
struct State {
    records: BTreeMap<String, Value>,
    next_auto_id: u64,
    calls: CallCounts,
    fail_on: Option<Operation>,
}

/// A map-backed index.
///
/// Behaves like the remote service for the operations the synchronizer uses:
/// saves upsert by object ID, records without an ID get `auto-{n}` when
/// automatic identifiers are enabled.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    name: String,
    state: Mutex<State>,
}

impl MemoryIndex {
    /// Create an empty index.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::default(),
        }
    }

    /// Seed the index with placeholder records under the given IDs.
    pub fn with_object_ids<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut state = self.lock();
            for id in ids {
                let id = id.into();
                state
                    .records
                    .insert(id.clone(), serde_json::json!({ "objectID": id }));
            }
        }
        self
    }

    /// Make every call of `operation` fail with a connection error.
    pub fn fail_on(self, operation: Operation) -> Self {
        self.lock().fail_on = Some(operation);
        self
    }

    /// IDs currently stored.
    pub fn object_ids(&self) -> BTreeSet<String> {
        self.lock().records.keys().cloned().collect()
    }

    /// The stored JSON for `object_id`.
    pub fn get(&self, object_id: &str) -> Option<Value> {
        self.lock().records.get(object_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call counters so far.
    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(state: &State, operation: Operation) -> Result<()> {
        if state.fail_on == Some(operation) {
            return Err(IndexError::connection(format!(
                "injected failure for {operation:?}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    fn index_name(&self) -> &str {
        &self.name
    }

    async fn save_records(
        &self,
        records: &[SearchRecord],
        options: SaveOptions,
    ) -> Result<Vec<String>> {
        let mut state = self.lock();
        state.calls.save += 1;
        Self::check(&state, Operation::Save)?;
        validate_records(records, options)?;

        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let id = match &record.object_id {
                Some(id) => id.clone(),
                None => {
                    state.next_auto_id += 1;
                    format!("auto-{}", state.next_auto_id)
                }
            };
            let mut value = serde_json::to_value(record)?;
            if let Value::Object(map) = &mut value {
                map.insert("objectID".to_string(), Value::String(id.clone()));
            }
            state.records.insert(id.clone(), value);
            ids.push(id);
        }

        debug!(index = %self.name, count = ids.len(), "Saved records in memory");
        Ok(ids)
    }

    async fn list_object_ids(&self) -> Result<BTreeSet<String>> {
        let mut state = self.lock();
        state.calls.list += 1;
        Self::check(&state, Operation::List)?;
        Ok(state.records.keys().cloned().collect())
    }

    async fn delete_records(&self, object_ids: &[String]) -> Result<usize> {
        if object_ids.is_empty() {
            return Ok(0);
        }

        let mut state = self.lock();
        state.calls.delete += 1;
        Self::check(&state, Operation::Delete)?;
        for id in object_ids {
            state.records.remove(id);
        }
        Ok(object_ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;

    #[tokio::test]
    async fn test_save_upserts_by_id() {
        let index = MemoryIndex::new("docs").with_object_ids(["a-1"]);
        let ids = index
            .save_records(
                &[record("a", 1, Some("a-1")), record("b", 1, Some("b-1"))],
                SaveOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(ids, vec!["a-1", "b-1"]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("a-1").unwrap()["slug"], "a");
    }

    #[tokio::test]
    async fn test_auto_ids() {
        let index = MemoryIndex::new("docs");
        let ids = index
            .save_records(
                &[record("a", 1, None), record("a", 2, None)],
                SaveOptions::auto_generate(),
            )
            .await
            .unwrap();
        assert_eq!(ids, vec!["auto-1", "auto-2"]);
        assert_eq!(index.get("auto-2").unwrap()["objectID"], "auto-2");
    }

    #[tokio::test]
    async fn test_missing_id_rejected() {
        let index = MemoryIndex::new("docs");
        let err = index
            .save_records(&[record("a", 1, None)], SaveOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::Validation(_)));
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_delete_and_counters() {
        let index = MemoryIndex::new("docs").with_object_ids(["a", "b", "c"]);
        assert_eq!(index.delete_records(&[]).await.unwrap(), 0);
        assert_eq!(
            index
                .delete_records(&["a".to_string(), "c".to_string()])
                .await
                .unwrap(),
            2
        );
        let remaining = index.list_object_ids().await.unwrap();

        assert_eq!(remaining, BTreeSet::from(["b".to_string()]));
        assert_eq!(
            index.calls(),
            CallCounts {
                save: 0,
                list: 1,
                delete: 1
            }
        );
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let index = MemoryIndex::new("docs").fail_on(Operation::List);
        assert!(matches!(
            index.list_object_ids().await,
            Err(IndexError::Connection(_))
        ));
    }
}
