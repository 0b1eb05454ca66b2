//! Page and sort interpretation shared by every caller.
//!
//! `skip = (page_number - 1) * page_size` and `limit = page_size`. A zero or
//! missing page size means unbounded: no skip, no limit. A skip of zero is
//! never emitted.

use serde::Deserialize;
use utoipa::ToSchema;

use super::error::FilterError;
use super::sort::{RawSort, SortSpec};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
pub struct PageSpec {
    /// 1-based page number
    #[serde(default, alias = "page_nbr")]
    #[schema(minimum = 1, example = 1)]
    pub page_number: Option<u64>,
    /// Items per page; 0 means unbounded
    #[serde(default, alias = "nbr")]
    #[schema(example = 10)]
    pub page_size: Option<u64>,
}

/// Derived skip/limit pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl PageSpec {
    #[must_use]
    pub const fn new(page_number: u64, page_size: u64) -> Self {
        Self {
            page_number: Some(page_number),
            page_size: Some(page_size),
        }
    }

    /// # Errors
    ///
    /// [`FilterError::InvalidPageNumber`] when `page_number` is 0.
    pub fn window(&self) -> Result<Window, FilterError> {
        if self.page_number == Some(0) {
            return Err(FilterError::InvalidPageNumber(0));
        }

        let limit = self.page_size.filter(|size| *size > 0);
        let skip = match (self.page_number, limit) {
            (Some(page), Some(size)) => Some((page - 1).saturating_mul(size)).filter(|s| *s > 0),
            _ => None,
        };

        Ok(Window { skip, limit })
    }
}

/// Result of [`interpret`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interpretation {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub sort: Option<SortSpec>,
}

impl Interpretation {
    #[must_use]
    pub const fn window(&self) -> Window {
        Window {
            skip: self.skip,
            limit: self.limit,
        }
    }
}

/// Convert page and sort payloads into skip, limit and sort.
///
/// # Errors
///
/// Page number 0, or an unrecognised sort direction.
pub fn interpret(page: &PageSpec, sort: Option<&RawSort>) -> Result<Interpretation, FilterError> {
    let Window { skip, limit } = page.window()?;
    let sort = match sort {
        Some(raw) => raw.resolve()?,
        None => None,
    };
    Ok(Interpretation { skip, limit, sort })
}
