use serde_json::{Value, json};
use thiserror::Error;

/// Everything that can be wrong with a filter, sort or page description.
///
/// All of these are detected before a query is handed to storage and are
/// client errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// The value does not have the shape its operator requires
    #[error("value for `{field}` with operator `{operator}` should be {expected}")]
    InvalidValueShape {
        field: String,
        operator: &'static str,
        value: Value,
        expected: &'static str,
    },

    /// The field slot does not fit the operator (a name where coordinates are expected, or the reverse)
    #[error("operator `{operator}` cannot be applied to field {field}")]
    InvalidField { operator: &'static str, field: Value },

    #[error("unknown operator `{0}`")]
    UnknownOperator(String),

    #[error("unknown combinator `{0}`")]
    UnknownCombinator(String),

    #[error("combined filter holds {count} proximity elements, at most one is allowed")]
    MultipleGeoAnchors { count: usize },

    /// Keys of both the single and the combined shape were supplied
    #[error("filter mixes single filter keys with combined filter elements")]
    AmbiguousDescriptor,

    #[error("filter is missing `{0}`")]
    IncompleteDescriptor(&'static str),

    /// Payload could not be read as a filter descriptor at all
    #[error("malformed filter: {0}")]
    Malformed(String),

    #[error("sort requires both a field and a direction")]
    MissingSortComponent {
        field: Option<String>,
        direction: Option<Value>,
    },

    #[error("sort direction {0} is not one of 1, -1, \"asc\", \"desc\"")]
    InvalidSortDirection(Value),

    #[error("page number must be at least 1, got {0}")]
    InvalidPageNumber(u64),

    /// A proximity filter was used where only a flat predicate is accepted
    #[error("proximity filters can only be used in aggregation queries")]
    AnchorNotAllowed,
}

impl FilterError {
    /// Structured echo of the offending input, sent back alongside the message.
    #[must_use]
    pub fn details(&self) -> Value {
        match self {
            Self::InvalidValueShape {
                field,
                operator,
                value,
                expected,
            } => json!({
                "field": field,
                "operator": operator,
                "value": value,
                "expected": expected,
            }),
            Self::InvalidField { operator, field } => json!({
                "field": field,
                "operator": operator,
            }),
            Self::UnknownOperator(tag) | Self::UnknownCombinator(tag) => json!({ "operator": tag }),
            Self::MultipleGeoAnchors { count } => json!({ "geo_elements": count }),
            Self::MissingSortComponent { field, direction } => json!({
                "field": field,
                "direction": direction,
            }),
            Self::InvalidSortDirection(direction) => json!({ "direction": direction }),
            Self::InvalidPageNumber(page) => json!({ "page_number": page }),
            Self::IncompleteDescriptor(missing) => json!({ "missing": missing }),
            Self::AmbiguousDescriptor | Self::Malformed(_) | Self::AnchorNotAllowed => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_shape_echoes_input() {
        let err = FilterError::InvalidValueShape {
            field: "cuisine".to_string(),
            operator: "$in",
            value: json!("Bakery"),
            expected: "an array",
        };
        assert_eq!(
            err.to_string(),
            "value for `cuisine` with operator `$in` should be an array"
        );
        assert_eq!(err.details()["field"], "cuisine");
        assert_eq!(err.details()["operator"], "$in");
        assert_eq!(err.details()["value"], "Bakery");
    }

    #[test]
    fn test_details_null_for_shape_free_errors() {
        assert!(FilterError::AmbiguousDescriptor.details().is_null());
        assert!(FilterError::AnchorNotAllowed.details().is_null());
    }
}
