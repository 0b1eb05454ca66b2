use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use utoipa::ToSchema;

use super::error::FilterError;
use crate::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Numeric form used by the store: `1` or `-1`
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Ascending => 1,
            Self::Descending => -1,
        }
    }

    /// Accepts `1`, `-1`, `"asc"`, `"desc"` (and the spelled-out forms, any case).
    ///
    /// # Errors
    ///
    /// [`FilterError::InvalidSortDirection`] for anything else.
    pub fn parse(value: &Value) -> Result<Self, FilterError> {
        let parsed = match value {
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(Self::Ascending),
                Some(-1) => Some(Self::Descending),
                _ => None,
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "asc" | "ascending" | "1" => Some(Self::Ascending),
                "desc" | "descending" | "-1" => Some(Self::Descending),
                _ => None,
            },
            _ => None,
        };
        parsed.ok_or_else(|| FilterError::InvalidSortDirection(value.clone()))
    }
}

impl Serialize for SortDirection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.as_i32())
    }
}

/// Canonical sort: one field and a direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn ascending(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Ascending)
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Descending)
    }

    /// `{field: 1|-1}`
    #[must_use]
    pub fn to_document(&self) -> Document {
        let mut document = Document::new();
        document.insert(self.field.clone(), Value::from(self.direction.as_i32()));
        document
    }
}

/// Sort payload as received; `way` is accepted for `direction`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
pub struct RawSort {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default, alias = "way")]
    #[schema(value_type = Object)]
    pub direction: Option<Value>,
}

impl RawSort {
    fn field(&self) -> Option<&str> {
        self.field.as_deref().map(str::trim).filter(|f| !f.is_empty())
    }

    fn direction(&self) -> Option<&Value> {
        self.direction.as_ref().filter(|d| !d.is_null())
    }

    /// A partial sort (only field, or only direction) counts as no sort.
    ///
    /// # Errors
    ///
    /// [`FilterError::InvalidSortDirection`] when a direction is present but unrecognised.
    pub fn resolve(&self) -> Result<Option<SortSpec>, FilterError> {
        match (self.field(), self.direction()) {
            (Some(field), Some(direction)) => {
                Ok(Some(SortSpec::new(field, SortDirection::parse(direction)?)))
            }
            _ => Ok(None),
        }
    }

    /// Same as [`RawSort::resolve`] but both parts are mandatory.
    ///
    /// # Errors
    ///
    /// [`FilterError::MissingSortComponent`] when either part is missing.
    pub fn require(&self) -> Result<SortSpec, FilterError> {
        self.resolve()?
            .ok_or_else(|| FilterError::MissingSortComponent {
                field: self.field.clone(),
                direction: self.direction.clone(),
            })
    }
}
