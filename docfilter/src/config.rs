//! Compiler configuration.
//!
//! Every field has a default, so an empty JSON/TOML table (or
//! [`CompilerConfig::default`]) gives the standard behaviour:
//!
//! ```json
//! {
//!     "contains_mode": "literal",
//!     "distance_field": "distance",
//!     "spherical": true,
//!     "geo_key": null,
//!     "exclude_fields": ["_id"],
//!     "default_list_limit": 30
//! }
//! ```

use serde::{Deserialize, Serialize};

/// How the `contains` operator embeds its value into a pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainsMode {
    /// Regex metacharacters in the value are escaped; the value is a plain substring
    #[default]
    Literal,
    /// The value is embedded unescaped and may use pattern syntax
    Pattern,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub contains_mode: ContainsMode,
    /// Output field the proximity stage writes each document's distance to
    pub distance_field: String,
    pub spherical: bool,
    /// Document field holding the indexed location, when the store needs it named
    pub geo_key: Option<String>,
    /// Fields removed by the final projection stage
    pub exclude_fields: Vec<String>,
    /// Limit applied to list queries that do not request a page size
    pub default_list_limit: Option<u64>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            contains_mode: ContainsMode::Literal,
            distance_field: "distance".to_string(),
            spherical: true,
            geo_key: None,
            exclude_fields: vec!["_id".to_string()],
            default_list_limit: Some(30),
        }
    }
}

impl CompilerConfig {
    #[must_use]
    pub fn with_contains_mode(mut self, mode: ContainsMode) -> Self {
        self.contains_mode = mode;
        self
    }

    #[must_use]
    pub fn with_geo_key(mut self, key: impl Into<String>) -> Self {
        self.geo_key = Some(key.into());
        self
    }
}
