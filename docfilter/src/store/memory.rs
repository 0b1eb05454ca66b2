use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::eval::{apply_mutation, matches, run, set_path, upsert_seed};
use super::{DocumentStore, StoreError, UpdateOutcome};
use crate::Document;

/// In-process [`DocumentStore`] keyed by collection name.
///
/// Proximity stages need to know which field holds each collection's
/// coordinates; register it with [`MemoryStore::with_geo_index`] or pass `key`
/// in the stage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    geo_indexes: HashMap<String, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_geo_index(mut self, collection: impl Into<String>, field: impl Into<String>) -> Self {
        self.geo_indexes.insert(collection.into(), field.into());
        self
    }

    /// Bulk insert; documents without `_id` get one.
    pub async fn seed(&self, collection: &str, documents: impl IntoIterator<Item = Document>) {
        let mut collections = self.collections.write().await;
        let rows = collections.entry(collection.to_string()).or_default();
        rows.extend(documents.into_iter().map(with_id));
    }

    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }

    fn geo_key(&self, collection: &str) -> Option<&str> {
        self.geo_indexes.get(collection).map(String::as_str)
    }

    async fn update(
        &self,
        collection: &str,
        predicate: &Document,
        mutation: &Document,
        upsert: bool,
        many: bool,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut collections = self.collections.write().await;
        let rows = collections.entry(collection.to_string()).or_default();

        // Mutate copies so a failure on a later row leaves the collection untouched
        let mut outcome = UpdateOutcome::default();
        let mut staged = Vec::new();
        for (position, row) in rows.iter().enumerate() {
            if !matches(row, predicate)? {
                continue;
            }
            outcome.matched += 1;
            let mut updated = row.clone();
            if apply_mutation(&mut updated, mutation)? {
                outcome.modified += 1;
                staged.push((position, updated));
            }
            if !many {
                break;
            }
        }
        for (position, updated) in staged {
            rows[position] = updated;
        }

        if outcome.matched == 0 && upsert {
            let mut seeded = upsert_seed(predicate)?;
            if let Some(fields) = mutation.get("$set").and_then(Value::as_object) {
                for (path, value) in fields {
                    set_path(&mut seeded, path, value.clone())?;
                }
            }
            rows.push(with_id(seeded));
            outcome.modified = 1;
            tracing::debug!(collection, "upserted document");
        }

        tracing::debug!(
            collection,
            matched = outcome.matched,
            modified = outcome.modified,
            "update applied"
        );
        Ok(outcome)
    }

    async fn delete(&self, collection: &str, predicate: &Document, many: bool) -> Result<u64, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(rows) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let mut doomed = Vec::new();
        for (position, row) in rows.iter().enumerate() {
            if matches(row, predicate)? {
                doomed.push(position);
                if !many {
                    break;
                }
            }
        }
        for position in doomed.iter().rev() {
            rows.remove(*position);
        }
        Ok(doomed.len() as u64)
    }
}

fn with_id(mut document: Document) -> Document {
    if !document.contains_key("_id") {
        document.insert("_id".to_string(), Value::String(Uuid::new_v4().to_string()));
    }
    document
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_one(
        &self,
        collection: &str,
        predicate: &Document,
    ) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        for row in collections.get(collection).into_iter().flatten() {
            if matches(row, predicate)? {
                return Ok(Some(row.clone()));
            }
        }
        Ok(None)
    }

    async fn find(&self, collection: &str, predicate: &Document) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let mut found = Vec::new();
        for row in collections.get(collection).into_iter().flatten() {
            if matches(row, predicate)? {
                found.push(row.clone());
            }
        }
        Ok(found)
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &[Document],
    ) -> Result<Vec<Document>, StoreError> {
        let rows = self
            .collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default();
        let result = run(rows, pipeline, self.geo_key(collection));
        if let Err(error) = &result {
            tracing::warn!(collection, %error, "pipeline rejected");
        }
        result
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<Document, StoreError> {
        let document = with_id(document);
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(document.clone());
        Ok(document)
    }

    async fn update_one(
        &self,
        collection: &str,
        predicate: &Document,
        mutation: &Document,
        upsert: bool,
    ) -> Result<UpdateOutcome, StoreError> {
        self.update(collection, predicate, mutation, upsert, false).await
    }

    async fn update_many(
        &self,
        collection: &str,
        predicate: &Document,
        mutation: &Document,
        upsert: bool,
    ) -> Result<UpdateOutcome, StoreError> {
        self.update(collection, predicate, mutation, upsert, true).await
    }

    async fn delete_one(&self, collection: &str, predicate: &Document) -> Result<u64, StoreError> {
        self.delete(collection, predicate, false).await
    }

    async fn delete_many(&self, collection: &str, predicate: &Document) -> Result<u64, StoreError> {
        self.delete(collection, predicate, true).await
    }
}
