//! # Filtering, sorting and pagination
//!
//! Turns wire payloads into the store's query shapes.
//!
//! ## Operators
//!
//! | tag(s)                   | meaning                                        |
//! |--------------------------|------------------------------------------------|
//! | `eq`, `$eq`              | equality                                       |
//! | `ne`, `$ne`              | inequality                                     |
//! | `contains`, `$regex`     | case-insensitive substring                     |
//! | `in`, `$in`              | value is one of an array                       |
//! | `not_in`, `$nin`         | value is none of an array                      |
//! | `gt` `gte` `lt` `lte`    | ordering comparisons                           |
//! | `not`, `$not`            | negates an operator object, e.g. `{"$gt": 5}`  |
//! | `geo_near`, `$geoNear`   | within `value` metres of the `[lng, lat]` field |
//!
//! A proximity `value` may also be `{"min": m, "max": n}` to keep only
//! documents between `m` and `n` metres away.
//!
//! Combinators: `and`, `or`, `nor`.
//!
//! ## Examples
//!
//! ```rust,ignore
//! // {"field": "cuisine", "operator": "in", "value": ["Bakery", "Pizza"]}
//! //   => {"$match": {"cuisine": {"$in": ["Bakery", "Pizza"]}}}
//!
//! // {"operator": "and", "elements": [
//! //     {"field": [-73.98, 40.62], "operator": "geo_near", "value": 500},
//! //     {"field": "borough", "operator": "eq", "value": "Brooklyn"}]}
//! //   => {"$geoNear": {..., "query": {"$and": [{"borough": "Brooklyn"}]}}}
//! ```

pub mod combinator;
pub mod compiler;
pub mod descriptor;
pub mod error;
pub mod geo;
pub mod operators;
pub mod pagination;
pub mod predicate;
pub mod sort;

pub use combinator::{combine, compile_combined, conjoin};
pub use compiler::{CompiledFilter, FilterCompiler};
pub use descriptor::{
    CombinedFilter, FilterDescriptor, FilterField, RawFilter, RawSingle, SingleFilter,
};
pub use error::FilterError;
pub use geo::GeoNear;
pub use operators::{Combinator, Operator};
pub use pagination::{Interpretation, PageSpec, Window, interpret};
pub use predicate::{Constraint, Fragment, Predicate, compile_single};
pub use sort::{RawSort, SortDirection, SortSpec};
