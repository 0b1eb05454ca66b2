//! # docfilter
//!
//! Compiles small, wire-transmitted filter descriptors (field, operator, value,
//! optional boolean combination, sort and pagination) into the query shapes a
//! document store understands: a flat match predicate, or an ordered aggregation
//! pipeline anchored by a geo-proximity stage when one is requested.
//!
//! ```rust,ignore
//! use docfilter::{FilterCompiler, QueryParams};
//!
//! let params: QueryParams = serde_json::from_value(json!({
//!     "page_number": 3,
//!     "page_size": 10,
//!     "filters": {
//!         "operator": "and",
//!         "elements": [
//!             {"field": "name", "operator": "contains", "value": "Wendy"},
//!             {"field": "borough", "operator": "eq", "value": "Brooklyn"}
//!         ]
//!     },
//!     "sort": {"field": "name", "direction": 1}
//! }))?;
//!
//! let compiler = FilterCompiler::default();
//! let pipeline = compiler.pipeline_for(&params)?;
//! let rows = store.aggregate("restaurants", &pipeline.to_documents()).await?;
//! ```

pub mod config;
pub mod errors;
pub mod filtering;
pub mod models;
pub mod pipeline;
pub mod resource;
pub mod store;

/// A document, predicate or stage body in the store's native JSON shape.
pub type Document = serde_json::Map<String, serde_json::Value>;

pub use config::{CompilerConfig, ContainsMode};
pub use errors::ApiError;
pub use filtering::{
    Combinator, CombinedFilter, CompiledFilter, FilterCompiler, FilterDescriptor, FilterError,
    FilterField, Fragment, GeoNear, Operator, PageSpec, RawFilter, RawSort, SingleFilter,
    SortDirection, SortSpec, Window,
};
pub use models::{DeleteSummary, ListResponse, QueryParams, UpdateSummary};
pub use pipeline::{Accumulated, Accumulator, DistinctQuery, Pipeline, PipelineBuilder, Stage};
pub use resource::QueryResource;
pub use store::{DocumentStore, MemoryStore, StoreError, UpdateOutcome};
