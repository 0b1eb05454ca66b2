//! Closed catalog of field operators and combinators.
//!
//! Wire tags are accepted either in symbolic form (`"eq"`, `"not_in"`) or in the
//! store's own form (`"$eq"`, `"$nin"`); both resolve through a single exhaustive
//! match so an unrecognised tag can never fall through to a default.

use std::fmt;
use std::str::FromStr;

use super::error::FilterError;

/// Field operators usable in a single filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Direct equality, compiled without an operator wrapper
    Equals,
    /// `$ne`
    NotEquals,
    /// Case-insensitive substring match
    Contains,
    /// `$in`, value must be an array
    In,
    /// `$nin`, value must be an array
    NotIn,
    /// `$gt`
    GreaterThan,
    /// `$gte`
    GreaterOrEqual,
    /// `$lt`
    LessThan,
    /// `$lte`
    LessOrEqual,
    /// `$not`, value must be an operator object
    Not,
    /// Proximity search; the filter's field carries `[lng, lat]` and the value a maximum distance
    GeoNear,
}

impl Operator {
    pub const ALL: [Self; 11] = [
        Self::Equals,
        Self::NotEquals,
        Self::Contains,
        Self::In,
        Self::NotIn,
        Self::GreaterThan,
        Self::GreaterOrEqual,
        Self::LessThan,
        Self::LessOrEqual,
        Self::Not,
        Self::GeoNear,
    ];

    /// Resolve a wire tag.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::UnknownOperator`] for anything outside the catalog.
    pub fn parse(tag: &str) -> Result<Self, FilterError> {
        let trimmed = tag.trim();
        let bare = trimmed.strip_prefix('$').unwrap_or(trimmed);
        match bare.to_ascii_lowercase().as_str() {
            "eq" | "equals" => Ok(Self::Equals),
            "ne" | "neq" | "not_equals" => Ok(Self::NotEquals),
            "regex" | "contains" | "like" => Ok(Self::Contains),
            "in" => Ok(Self::In),
            "nin" | "not_in" => Ok(Self::NotIn),
            "gt" => Ok(Self::GreaterThan),
            "gte" => Ok(Self::GreaterOrEqual),
            "lt" => Ok(Self::LessThan),
            "lte" => Ok(Self::LessOrEqual),
            "not" => Ok(Self::Not),
            "geonear" | "geo_near" | "near" => Ok(Self::GeoNear),
            _ => Err(FilterError::UnknownOperator(tag.to_string())),
        }
    }

    /// Tag used in the compiled query
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Equals => "$eq",
            Self::NotEquals => "$ne",
            Self::Contains => "$regex",
            Self::In => "$in",
            Self::NotIn => "$nin",
            Self::GreaterThan => "$gt",
            Self::GreaterOrEqual => "$gte",
            Self::LessThan => "$lt",
            Self::LessOrEqual => "$lte",
            Self::Not => "$not",
            Self::GeoNear => "$geoNear",
        }
    }

    #[must_use]
    pub const fn is_geo(self) -> bool {
        matches!(self, Self::GeoNear)
    }
}

impl FromStr for Operator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Boolean joins for combined filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    And,
    Or,
    /// Negated disjunction: matches when none of the elements match
    Nor,
}

impl Combinator {
    /// Resolve a wire tag.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::UnknownCombinator`] for anything but and/or/nor.
    pub fn parse(tag: &str) -> Result<Self, FilterError> {
        let trimmed = tag.trim();
        let bare = trimmed.strip_prefix('$').unwrap_or(trimmed);
        match bare.to_ascii_lowercase().as_str() {
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            "nor" => Ok(Self::Nor),
            _ => Err(FilterError::UnknownCombinator(tag.to_string())),
        }
    }

    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::And => "$and",
            Self::Or => "$or",
            Self::Nor => "$nor",
        }
    }
}

impl FromStr for Combinator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
