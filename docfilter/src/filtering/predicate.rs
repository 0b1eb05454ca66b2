//! Single filter compilation.
//!
//! | operator         | compiled fragment                                   |
//! |------------------|-----------------------------------------------------|
//! | equals           | `{field: value}`                                    |
//! | ne, gt/gte/lt/lte| `{field: {"$op": value}}`                           |
//! | contains         | `{field: {"$regex": ".*value.*", "$options": "i"}}` |
//! | in / not-in      | `{field: {"$in"/"$nin": [..]}}` (array required)    |
//! | not              | `{field: {"$not": {..}}}` (object required)         |
//! | geo-near         | `{"$geoNear": {..}}` anchor stage                   |

use serde_json::{Value, json};

use super::descriptor::{FilterField, SingleFilter};
use super::error::FilterError;
use super::geo::GeoNear;
use super::operators::Operator;
use crate::Document;
use crate::config::{CompilerConfig, ContainsMode};

/// Right-hand side of a compiled predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Equals(Value),
    Compare { operator: Operator, value: Value },
    Pattern { pattern: String, case_insensitive: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub constraint: Constraint,
}

impl Predicate {
    #[must_use]
    pub fn to_document(&self) -> Document {
        let rhs = match &self.constraint {
            Constraint::Equals(value) => value.clone(),
            Constraint::Compare { operator, value } => json!({ operator.tag(): value }),
            Constraint::Pattern {
                pattern,
                case_insensitive,
            } => {
                if *case_insensitive {
                    json!({ "$regex": pattern, "$options": "i" })
                } else {
                    json!({ "$regex": pattern })
                }
            }
        };
        let mut document = Document::new();
        document.insert(self.field.clone(), rhs);
        document
    }
}

/// Output of compiling one single filter: a predicate, or a proximity anchor stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Predicate(Predicate),
    Anchor(GeoNear),
}

impl Fragment {
    #[must_use]
    pub fn to_document(&self) -> Document {
        match self {
            Self::Predicate(predicate) => predicate.to_document(),
            Self::Anchor(geo) => geo.to_document(),
        }
    }
}

fn display_field(field: &FilterField) -> String {
    match field {
        FilterField::Path(path) => path.clone(),
        FilterField::Coordinates(_) => field.to_value().to_string(),
    }
}

fn shape_error(filter: &SingleFilter, expected: &'static str) -> FilterError {
    FilterError::InvalidValueShape {
        field: display_field(&filter.field),
        operator: filter.operator.tag(),
        value: filter.value.clone(),
        expected,
    }
}

fn field_path(filter: &SingleFilter) -> Result<String, FilterError> {
    match &filter.field {
        FilterField::Path(path) if !path.trim().is_empty() => Ok(path.clone()),
        other => Err(FilterError::InvalidField {
            operator: filter.operator.tag(),
            field: other.to_value(),
        }),
    }
}

/// Build the `.*value.*` pattern used by `contains`.
fn contains_pattern(value: &Value, mode: ContainsMode) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    let body = match mode {
        ContainsMode::Literal => regex::escape(&text),
        ContainsMode::Pattern => text,
    };
    Some(format!(".*{body}.*"))
}

fn compile_near(filter: &SingleFilter, config: &CompilerConfig) -> Result<GeoNear, FilterError> {
    let (lng, lat) = match &filter.field {
        FilterField::Coordinates(coords)
            if coords.len() == 2
                && (-180.0..=180.0).contains(&coords[0])
                && (-90.0..=90.0).contains(&coords[1]) =>
        {
            (coords[0], coords[1])
        }
        other => {
            return Err(FilterError::InvalidField {
                operator: filter.operator.tag(),
                field: other.to_value(),
            });
        }
    };

    let distance = |value: Option<&Value>| {
        value
            .and_then(Value::as_f64)
            .filter(|d| d.is_finite() && *d >= 0.0)
    };
    let expected = "a non-negative number or {\"min\", \"max\"}";
    let (min_distance, max_distance) = match &filter.value {
        Value::Object(range) => {
            let max = distance(range.get("max")).ok_or_else(|| shape_error(filter, expected))?;
            let min = match range.get("min") {
                None | Some(Value::Null) => None,
                Some(min) => Some(
                    distance(Some(min))
                        .filter(|min| *min <= max)
                        .ok_or_else(|| shape_error(filter, expected))?,
                ),
            };
            (min, max)
        }
        value => (
            None,
            distance(Some(value)).ok_or_else(|| shape_error(filter, expected))?,
        ),
    };

    let geo = GeoNear::new(lng, lat, max_distance, config);
    Ok(match min_distance {
        Some(min_distance) => geo.with_min_distance(min_distance),
        None => geo,
    })
}

/// Compile one `(field, operator, value)` triple.
///
/// # Errors
///
/// - [`FilterError::InvalidValueShape`] when the value breaks the operator's type rule
/// - [`FilterError::InvalidField`] when the field slot does not suit the operator
pub fn compile_single(
    filter: &SingleFilter,
    config: &CompilerConfig,
) -> Result<Fragment, FilterError> {
    let operator = filter.operator;
    let value = &filter.value;

    let constraint = match operator {
        Operator::GeoNear => return compile_near(filter, config).map(Fragment::Anchor),
        Operator::Equals => Constraint::Equals(value.clone()),
        Operator::NotEquals
        | Operator::GreaterThan
        | Operator::GreaterOrEqual
        | Operator::LessThan
        | Operator::LessOrEqual => Constraint::Compare {
            operator,
            value: value.clone(),
        },
        Operator::Contains => Constraint::Pattern {
            pattern: contains_pattern(value, config.contains_mode)
                .ok_or_else(|| shape_error(filter, "a string, number or boolean"))?,
            case_insensitive: true,
        },
        Operator::In | Operator::NotIn => {
            if !value.is_array() {
                return Err(shape_error(filter, "an array"));
            }
            Constraint::Compare {
                operator,
                value: value.clone(),
            }
        }
        Operator::Not => match value {
            Value::Object(inner)
                if !inner.is_empty() && inner.keys().all(|key| key.starts_with('$')) =>
            {
                Constraint::Compare {
                    operator,
                    value: value.clone(),
                }
            }
            _ => return Err(shape_error(filter, "an operator object")),
        },
    };

    Ok(Fragment::Predicate(Predicate {
        field: field_path(filter)?,
        constraint,
    }))
}
