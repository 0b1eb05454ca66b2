//! Storage collaborator.
//!
//! The compiler only produces query documents; something has to run them.
//! [`DocumentStore`] is that seam, and [`MemoryStore`] is an implementation
//! that evaluates the same query language in process.

mod eval;
pub mod geometry;
mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::Document;

pub use memory::MemoryStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("invalid pipeline: {0}")]
    InvalidPipeline(String),
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),
    #[error("invalid mutation: {0}")]
    InvalidMutation(String),
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Operations the resource layer needs from a document store.
///
/// Predicates, mutations and pipelines use the store's JSON query language.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_one(
        &self,
        collection: &str,
        predicate: &Document,
    ) -> Result<Option<Document>, StoreError>;

    async fn find(&self, collection: &str, predicate: &Document)
    -> Result<Vec<Document>, StoreError>;

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &[Document],
    ) -> Result<Vec<Document>, StoreError>;

    async fn insert_one(&self, collection: &str, document: Document)
    -> Result<Document, StoreError>;

    /// `upsert` inserts the mutation's `$set` fields (plus the predicate's
    /// equality fields) when nothing matches.
    async fn update_one(
        &self,
        collection: &str,
        predicate: &Document,
        mutation: &Document,
        upsert: bool,
    ) -> Result<UpdateOutcome, StoreError>;

    async fn update_many(
        &self,
        collection: &str,
        predicate: &Document,
        mutation: &Document,
        upsert: bool,
    ) -> Result<UpdateOutcome, StoreError>;

    async fn delete_one(&self, collection: &str, predicate: &Document) -> Result<u64, StoreError>;

    async fn delete_many(&self, collection: &str, predicate: &Document)
    -> Result<u64, StoreError>;
}
