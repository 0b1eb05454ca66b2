//! Ordered aggregation pipelines.
//!
//! The builder keeps the head of the pipeline (match or proximity anchor)
//! separate from the tail so the anchor always renders first, whatever order
//! the caller adds constraints, sorting or paging in. Tail stages render in a
//! fixed order: group, sort, skip, limit, project.

pub mod distinct;

use serde::{Serialize, Serializer, ser::SerializeSeq};
use serde_json::Value;

use crate::Document;
use crate::filtering::{CompiledFilter, GeoNear, SortSpec, Window, conjoin};

pub use distinct::{Accumulated, Accumulator, DistinctQuery, Group};

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Document),
    GeoNear(GeoNear),
    Group(Group),
    Sort(SortSpec),
    Skip(u64),
    Limit(u64),
    Project(Document),
}

impl Stage {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Match(_) => "$match",
            Self::GeoNear(_) => "$geoNear",
            Self::Group(_) => "$group",
            Self::Sort(_) => "$sort",
            Self::Skip(_) => "$skip",
            Self::Limit(_) => "$limit",
            Self::Project(_) => "$project",
        }
    }

    /// `{kind: body}` as the store consumes it.
    #[must_use]
    pub fn to_document(&self) -> Document {
        let body = match self {
            Self::Match(predicate) | Self::Project(predicate) => Value::Object(predicate.clone()),
            Self::GeoNear(geo) => Value::Object(geo.to_stage_body()),
            Self::Group(group) => Value::Object(group.to_document()),
            Self::Sort(sort) => Value::Object(sort.to_document()),
            Self::Skip(n) | Self::Limit(n) => Value::from(*n),
        };
        let mut stage = Document::new();
        stage.insert(self.kind().to_string(), body);
        stage
    }
}

/// A finished, ordered stage sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    #[must_use]
    pub fn is_anchored(&self) -> bool {
        matches!(self.stages.first(), Some(Stage::GeoNear(_)))
    }

    #[must_use]
    pub fn to_documents(&self) -> Vec<Document> {
        self.stages.iter().map(Stage::to_document).collect()
    }
}

impl Serialize for Pipeline {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.stages.len()))?;
        for stage in &self.stages {
            seq.serialize_element(&stage.to_document())?;
        }
        seq.end()
    }
}

#[derive(Debug, Clone, Default)]
enum Head {
    #[default]
    Open,
    Match(Document),
    Anchored(GeoNear),
}

#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    head: Head,
    group: Option<Group>,
    sort: Option<SortSpec>,
    skip: Option<u64>,
    limit: Option<u64>,
    projection: Option<Document>,
}

impl PipelineBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_filter(filter: CompiledFilter) -> Self {
        let head = match filter {
            CompiledFilter::Unconstrained => Head::Open,
            CompiledFilter::Match(predicate) => Head::Match(predicate),
            CompiledFilter::Anchored(geo) => Head::Anchored(geo),
        };
        Self {
            head,
            ..Self::default()
        }
    }

    /// AND a fixed predicate into the head. An anchored head takes it into
    /// its embedded query.
    #[must_use]
    pub fn constrain(mut self, predicate: Document) -> Self {
        if predicate.is_empty() {
            return self;
        }
        self.head = match self.head {
            Head::Open => Head::Match(predicate),
            Head::Match(current) => Head::Match(conjoin(current, predicate)),
            Head::Anchored(mut geo) => {
                geo.constrain(predicate);
                Head::Anchored(geo)
            }
        };
        self
    }

    #[must_use]
    pub fn group(mut self, group: Group) -> Self {
        self.group = Some(group);
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: Option<SortSpec>) -> Self {
        self.sort = sort;
        self
    }

    /// Zero is the same as no skip.
    #[must_use]
    pub fn skip(mut self, skip: Option<u64>) -> Self {
        self.skip = skip.filter(|n| *n > 0);
        self
    }

    /// Zero is the same as no limit.
    #[must_use]
    pub fn limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit.filter(|n| *n > 0);
        self
    }

    #[must_use]
    pub fn window(self, window: Window) -> Self {
        self.skip(window.skip).limit(window.limit)
    }

    /// Drop `fields` in the final projection. No projection when empty.
    #[must_use]
    pub fn exclude<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        let projection: Document = fields
            .iter()
            .map(|field| (field.as_ref().to_string(), Value::from(0)))
            .collect();
        self.projection = (!projection.is_empty()).then_some(projection);
        self
    }

    /// Raw projection document, replacing any exclusion list.
    #[must_use]
    pub fn project(mut self, projection: Document) -> Self {
        self.projection = (!projection.is_empty()).then_some(projection);
        self
    }

    #[must_use]
    pub fn build(self) -> Pipeline {
        let mut stages = Vec::with_capacity(7);
        match self.head {
            Head::Open => {}
            Head::Match(predicate) => stages.push(Stage::Match(predicate)),
            Head::Anchored(geo) => stages.push(Stage::GeoNear(geo)),
        }
        stages.extend(self.group.map(Stage::Group));
        stages.extend(self.sort.map(Stage::Sort));
        stages.extend(self.skip.map(Stage::Skip));
        stages.extend(self.limit.map(Stage::Limit));
        stages.extend(self.projection.map(Stage::Project));

        let pipeline = Pipeline { stages };
        tracing::debug!(
            stages = pipeline.len(),
            anchored = pipeline.is_anchored(),
            "assembled pipeline"
        );
        pipeline
    }
}

/// `filter → sort → skip → limit → project`, dropping `exclude` at the end.
#[must_use]
pub fn assemble<S: AsRef<str>>(
    filter: CompiledFilter,
    sort: Option<SortSpec>,
    skip: Option<u64>,
    limit: Option<u64>,
    exclude: &[S],
) -> Pipeline {
    PipelineBuilder::from_filter(filter)
        .sort(sort)
        .skip(skip)
        .limit(limit)
        .exclude(exclude)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn kinds(pipeline: &Pipeline) -> Vec<&'static str> {
        pipeline.stages().iter().map(Stage::kind).collect()
    }

    #[test]
    fn test_full_order() {
        let pipeline = assemble(
            CompiledFilter::Match(doc(json!({"borough": "Queens"}))),
            Some(SortSpec::ascending("name")),
            Some(20),
            Some(10),
            &["_id"],
        );
        assert_eq!(
            kinds(&pipeline),
            ["$match", "$sort", "$skip", "$limit", "$project"]
        );
    }

    #[test]
    fn test_unconstrained_has_no_match_stage() {
        let pipeline = assemble::<&str>(CompiledFilter::Unconstrained, None, None, None, &[]);
        assert!(pipeline.is_empty());
    }

    #[test]
    fn test_empty_match_is_kept() {
        let pipeline = assemble::<&str>(CompiledFilter::Match(Document::new()), None, None, None, &[]);
        assert_eq!(serde_json::to_value(&pipeline).unwrap(), json!([{"$match": {}}]));
    }

    #[test]
    fn test_zero_skip_and_limit_are_dropped() {
        let pipeline = assemble(CompiledFilter::Unconstrained, None, Some(0), Some(0), &["_id"]);
        assert_eq!(kinds(&pipeline), ["$project"]);
    }

    #[test]
    fn test_anchor_stays_first_after_constrain() {
        let geo = GeoNear::new(-73.98, 40.62, 500.0, &CompilerConfig::default());
        let pipeline = PipelineBuilder::from_filter(CompiledFilter::Anchored(geo))
            .sort(Some(SortSpec::ascending("name")))
            .constrain(doc(json!({"name": {"$ne": ""}})))
            .limit(Some(5))
            .build();

        assert!(pipeline.is_anchored());
        assert_eq!(kinds(&pipeline), ["$geoNear", "$sort", "$limit"]);
        let Stage::GeoNear(anchor) = &pipeline.stages()[0] else {
            panic!("expected anchor");
        };
        assert_eq!(Value::Object(anchor.query().clone()), json!({"name": {"$ne": ""}}));
    }

    #[test]
    fn test_constrain_merges_match() {
        let pipeline = PipelineBuilder::from_filter(CompiledFilter::Match(doc(json!({"cuisine": "Pizza"}))))
            .constrain(doc(json!({"name": {"$ne": ""}})))
            .build();
        assert_eq!(
            serde_json::to_value(&pipeline).unwrap(),
            json!([{"$match": {"$and": [{"cuisine": "Pizza"}, {"name": {"$ne": ""}}]}}])
        );
    }

    #[test]
    fn test_constrain_opens_match() {
        let pipeline = PipelineBuilder::new()
            .constrain(doc(json!({"name": {"$ne": ""}})))
            .build();
        assert_eq!(kinds(&pipeline), ["$match"]);
    }
}
