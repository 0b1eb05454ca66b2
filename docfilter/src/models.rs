use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::Document;
use crate::filtering::{
    FilterDescriptor, FilterError, PageSpec, RawFilter, RawSort, pagination::Interpretation,
    interpret,
};

/// Request envelope shared by every query operation.
///
/// # Filtering
/// `filters` holds a single filter or a combined one:
/// ```json
/// {"field": "cuisine", "operator": "in", "value": ["Bakery", "Pizza"]}
/// ```
/// ```json
/// {"operator": "or", "elements": [
///     {"field": "borough", "operator": "eq", "value": "Queens"},
///     {"field": [-73.98, 40.62], "operator": "geo_near", "value": 500}
/// ]}
/// ```
///
/// # Pagination
/// `page_number` (1-based) and `page_size`; a page size of 0 means unbounded.
///
/// # Sorting
/// `{"field": "name", "direction": 1}`; direction also accepts `"asc"`/`"desc"`.
/// Distinct-value queries read the distinct field from here.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
pub struct QueryParams {
    #[serde(flatten)]
    pub page: PageSpec,
    #[serde(default, alias = "filter")]
    pub filters: Option<RawFilter>,
    #[serde(default)]
    pub sort: Option<RawSort>,
}

impl QueryParams {
    #[must_use]
    pub fn paged(page_number: u64, page_size: u64) -> Self {
        Self {
            page: PageSpec::new(page_number, page_size),
            ..Self::default()
        }
    }

    /// Validated filter descriptor, `None` when no filter was sent.
    ///
    /// # Errors
    ///
    /// See [`RawFilter::into_descriptor`].
    pub fn descriptor(&self) -> Result<Option<FilterDescriptor>, FilterError> {
        match &self.filters {
            Some(raw) => raw.clone().into_descriptor(),
            None => Ok(None),
        }
    }

    /// # Errors
    ///
    /// See [`interpret`].
    pub fn interpret(&self) -> Result<Interpretation, FilterError> {
        interpret(&self.page, self.sort.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ListResponse {
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Document>,
    /// Page number echoed from the request
    pub page_number: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UpdateSummary {
    /// Field the update touched, for single-field updates
    pub field: Option<String>,
    pub matched: u64,
    pub modified: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DeleteSummary {
    pub key: String,
    pub deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_historical_envelope() {
        let params: QueryParams = serde_json::from_value(json!({
            "nbr": 5,
            "page_nbr": 2,
            "filter": {"field": "name", "operator_field": "$regex", "value": "pizza"},
            "sort": {"field": "name", "way": -1}
        }))
        .unwrap();

        assert_eq!(params.page, PageSpec::new(2, 5));
        assert!(params.descriptor().unwrap().is_some());
        let interpretation = params.interpret().unwrap();
        assert_eq!(interpretation.skip, Some(5));
        assert_eq!(interpretation.limit, Some(5));
    }

    #[test]
    fn test_empty_envelope() {
        let params: QueryParams = serde_json::from_value(json!({"filters": {}})).unwrap();
        assert_eq!(params.descriptor().unwrap(), None);
        assert_eq!(params.interpret().unwrap(), Interpretation::default());
    }

    #[test]
    fn test_list_response_shape() {
        let response = ListResponse {
            data: vec![json!({"name": "Astoria"}).as_object().cloned().unwrap()],
            page_number: Some(1),
        };
        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({"data": [{"name": "Astoria"}], "page_number": 1})
        );
    }
}
