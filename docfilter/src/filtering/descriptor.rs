//! Filter descriptors: the wire payload and its validated form.
//!
//! A descriptor is either a *single* filter or a *combined* one:
//!
//! ```json
//! {"field": "borough", "operator": "eq", "value": "Brooklyn"}
//!
//! {"operator": "and", "elements": [
//!     {"field": "name", "operator": "contains", "value": "Wendy"},
//!     {"field": [-73.98, 40.62], "operator": "geo_near", "value": 500}
//! ]}
//! ```
//!
//! The historical key names `operator_field` (single operator) and
//! `filter_elements` are accepted as aliases. An empty object means "no filter".

use serde::Deserialize;
use serde_json::{Value, json};
use utoipa::ToSchema;

use super::error::FilterError;
use super::operators::{Combinator, Operator};

/// What a single filter targets.
///
/// For every operator except proximity this is a (possibly dotted) field path.
/// For [`Operator::GeoNear`] it carries the reference point as `[lng, lat]`.
#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum FilterField {
    Path(String),
    Coordinates(Vec<f64>),
}

impl FilterField {
    #[must_use]
    pub fn as_path(&self) -> Option<&str> {
        match self {
            Self::Path(path) => Some(path),
            Self::Coordinates(_) => None,
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Path(path) => Value::String(path.clone()),
            Self::Coordinates(coords) => Value::from(coords.clone()),
        }
    }
}

impl From<&str> for FilterField {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for FilterField {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SingleFilter {
    pub field: FilterField,
    pub operator: Operator,
    pub value: Value,
}

impl SingleFilter {
    pub fn new(field: impl Into<FilterField>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Proximity filter around `(lng, lat)` within `max_distance` metres.
    #[must_use]
    pub fn near(lng: f64, lat: f64, max_distance: f64) -> Self {
        Self {
            field: FilterField::Coordinates(vec![lng, lat]),
            operator: Operator::GeoNear,
            value: Value::from(max_distance),
        }
    }

    /// Proximity filter keeping documents between `min_distance` and
    /// `max_distance` metres of `(lng, lat)`.
    #[must_use]
    pub fn within(lng: f64, lat: f64, min_distance: f64, max_distance: f64) -> Self {
        Self {
            field: FilterField::Coordinates(vec![lng, lat]),
            operator: Operator::GeoNear,
            value: json!({"min": min_distance, "max": max_distance}),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CombinedFilter {
    pub combinator: Combinator,
    pub elements: Vec<SingleFilter>,
}

impl CombinedFilter {
    #[must_use]
    pub fn new(combinator: Combinator, elements: Vec<SingleFilter>) -> Self {
        Self {
            combinator,
            elements,
        }
    }
}

/// A validated filter description. Absence of a filter is `Option::None`, never an empty variant.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterDescriptor {
    Single(SingleFilter),
    Combined(CombinedFilter),
}

impl FilterDescriptor {
    /// Read a descriptor from an arbitrary JSON payload.
    ///
    /// # Errors
    ///
    /// [`FilterError::Malformed`] when the payload is not filter-shaped, plus any
    /// error from [`RawFilter::into_descriptor`].
    pub fn from_value(value: Value) -> Result<Option<Self>, FilterError> {
        if value.is_null() {
            return Ok(None);
        }
        let raw: RawFilter =
            serde_json::from_value(value).map_err(|e| FilterError::Malformed(e.to_string()))?;
        raw.into_descriptor()
    }
}

impl From<SingleFilter> for FilterDescriptor {
    fn from(filter: SingleFilter) -> Self {
        Self::Single(filter)
    }
}

impl From<CombinedFilter> for FilterDescriptor {
    fn from(filter: CombinedFilter) -> Self {
        Self::Combined(filter)
    }
}

/// One element of a combined filter, as received.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
pub struct RawSingle {
    #[serde(default)]
    pub field: Option<FilterField>,
    #[serde(default, alias = "operator_field")]
    pub operator: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub value: Value,
}

impl RawSingle {
    fn into_single(self) -> Result<SingleFilter, FilterError> {
        let tag = self
            .operator
            .ok_or(FilterError::IncompleteDescriptor("operator"))?;
        let operator = Operator::parse(&tag)?;
        let field = self.field.ok_or(FilterError::IncompleteDescriptor("field"))?;
        Ok(SingleFilter {
            field,
            operator,
            value: self.value,
        })
    }
}

/// Filter payload as received on the wire.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
pub struct RawFilter {
    #[serde(default)]
    pub field: Option<FilterField>,
    /// Field operator for a single filter, combinator for a combined one
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub operator_field: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub value: Value,
    #[serde(default, alias = "filter_elements")]
    pub elements: Option<Vec<RawSingle>>,
}

impl RawFilter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.field.is_none()
            && self.operator.is_none()
            && self.operator_field.is_none()
            && self.value.is_null()
            && self.elements.is_none()
    }

    /// Validate the payload into a descriptor; `Ok(None)` when nothing was supplied.
    ///
    /// # Errors
    ///
    /// - [`FilterError::AmbiguousDescriptor`] when single and combined keys are mixed
    /// - [`FilterError::IncompleteDescriptor`] when a required key is missing
    /// - [`FilterError::UnknownOperator`] / [`FilterError::UnknownCombinator`] for bad tags
    pub fn into_descriptor(self) -> Result<Option<FilterDescriptor>, FilterError> {
        if self.is_empty() {
            return Ok(None);
        }

        if let Some(elements) = self.elements {
            if self.field.is_some() || self.operator_field.is_some() || !self.value.is_null() {
                return Err(FilterError::AmbiguousDescriptor);
            }
            let tag = self
                .operator
                .ok_or(FilterError::IncompleteDescriptor("operator"))?;
            let combinator = Combinator::parse(&tag)?;
            let elements = elements
                .into_iter()
                .map(RawSingle::into_single)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Some(FilterDescriptor::Combined(CombinedFilter {
                combinator,
                elements,
            })));
        }

        let single = RawSingle {
            field: self.field,
            operator: self.operator_field.or(self.operator),
            value: self.value,
        };
        single.into_single().map(|s| Some(FilterDescriptor::Single(s)))
    }
}
