use serde_json::{Value, json};

use super::{Pipeline, PipelineBuilder};
use crate::Document;
use crate::filtering::{CompiledFilter, FilterError, RawSort, SortDirection, SortSpec, Window};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accumulator {
    First,
    AddToSet,
    Push,
}

impl Accumulator {
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::First => "$first",
            Self::AddToSet => "$addToSet",
            Self::Push => "$push",
        }
    }
}

/// One output column of a group: `name` collects `path` with `accumulator`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accumulated {
    pub name: String,
    pub path: String,
    pub accumulator: Accumulator,
}

impl Accumulated {
    pub fn new(name: impl Into<String>, path: impl Into<String>, accumulator: Accumulator) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            accumulator,
        }
    }

    pub fn first(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, path, Accumulator::First)
    }

    pub fn add_to_set(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, path, Accumulator::AddToSet)
    }
}

/// `$group` body keyed by one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub key: String,
    pub columns: Vec<Accumulated>,
}

impl Group {
    #[must_use]
    pub fn to_document(&self) -> Document {
        let mut body = Document::new();
        body.insert("_id".to_string(), Value::String(format!("${}", self.key)));
        for column in &self.columns {
            body.insert(
                column.name.clone(),
                json!({ column.accumulator.tag(): format!("${}", column.path) }),
            );
        }
        body
    }
}

/// Unique values of one field, sorted on the group key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistinctQuery {
    pub field: String,
    pub direction: SortDirection,
    pub extras: Vec<Accumulated>,
}

impl DistinctQuery {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
            extras: Vec::new(),
        }
    }

    /// The sort payload names the distinct field; both parts are required.
    ///
    /// # Errors
    ///
    /// [`FilterError::MissingSortComponent`] or [`FilterError::InvalidSortDirection`].
    pub fn from_sort(sort: Option<&RawSort>) -> Result<Self, FilterError> {
        let spec = sort.map_or_else(
            || {
                Err(FilterError::MissingSortComponent {
                    field: None,
                    direction: None,
                })
            },
            RawSort::require,
        )?;
        Ok(Self::new(spec.field, spec.direction))
    }

    #[must_use]
    pub fn with_extras(mut self, extras: Vec<Accumulated>) -> Self {
        self.extras = extras;
        self
    }

    /// Column holding the distinct value: the field path with dots replaced by underscores.
    #[must_use]
    pub fn output_key(&self) -> String {
        self.field.replace('.', "_")
    }

    #[must_use]
    pub fn group(&self) -> Group {
        let mut columns = Vec::with_capacity(self.extras.len() + 1);
        columns.push(Accumulated::first(self.output_key(), self.field.clone()));
        columns.extend(
            self.extras
                .iter()
                .filter(|extra| extra.name != self.output_key())
                .cloned(),
        );
        Group {
            key: self.field.clone(),
            columns,
        }
    }

    /// `{field: {"$ne": ""}}`
    #[must_use]
    pub fn non_empty(&self) -> Document {
        let mut predicate = Document::new();
        predicate.insert(self.field.clone(), json!({ "$ne": "" }));
        predicate
    }

    /// Match (or anchor) → group → sort on `_id` → skip → limit → project.
    #[must_use]
    pub fn assemble<S: AsRef<str>>(
        &self,
        filter: CompiledFilter,
        window: Window,
        exclude: &[S],
    ) -> Pipeline {
        PipelineBuilder::from_filter(filter)
            .constrain(self.non_empty())
            .group(self.group())
            .sort(Some(SortSpec::new("_id", self.direction)))
            .window(window)
            .exclude(exclude)
            .build()
    }
}
