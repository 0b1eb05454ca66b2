use super::combinator::compile_combined;
use super::descriptor::{CombinedFilter, FilterDescriptor, SingleFilter};
use super::error::FilterError;
use super::geo::GeoNear;
use super::pagination::Window;
use super::predicate::{Fragment, compile_single};
use super::sort::SortSpec;
use crate::Document;
use crate::config::CompilerConfig;
use crate::models::QueryParams;
use crate::pipeline::{Pipeline, PipelineBuilder};

/// Result of compiling an optional filter descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledFilter {
    /// No descriptor was supplied
    Unconstrained,
    /// Flat match predicate (possibly empty, for a combined filter with no elements)
    Match(Document),
    /// Proximity anchor with every other constraint folded into its query
    Anchored(GeoNear),
}

impl CompiledFilter {
    #[must_use]
    pub const fn is_anchored(&self) -> bool {
        matches!(self, Self::Anchored(_))
    }

    /// Flat predicate for find/update/delete callers.
    ///
    /// # Errors
    ///
    /// [`FilterError::AnchorNotAllowed`] when the filter needs a proximity stage.
    pub fn into_predicate(self) -> Result<Document, FilterError> {
        match self {
            Self::Unconstrained => Ok(Document::new()),
            Self::Match(predicate) => Ok(predicate),
            Self::Anchored(_) => Err(FilterError::AnchorNotAllowed),
        }
    }
}

/// Stateless filter compiler; holds only its configuration.
#[derive(Debug, Clone, Default)]
pub struct FilterCompiler {
    config: CompilerConfig,
}

impl FilterCompiler {
    #[must_use]
    pub const fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// # Errors
    ///
    /// See [`compile_single`].
    pub fn compile_single(&self, filter: &SingleFilter) -> Result<Fragment, FilterError> {
        compile_single(filter, &self.config)
    }

    /// # Errors
    ///
    /// See [`compile_combined`].
    pub fn compile_combined(&self, filter: &CombinedFilter) -> Result<CompiledFilter, FilterError> {
        compile_combined(filter, &self.config)
    }

    /// Compile an optional descriptor. `None` yields [`CompiledFilter::Unconstrained`].
    ///
    /// # Errors
    ///
    /// Any validation failure of the descriptor's operators or values.
    pub fn compile(
        &self,
        descriptor: Option<&FilterDescriptor>,
    ) -> Result<CompiledFilter, FilterError> {
        let compiled = match descriptor {
            None => Ok(CompiledFilter::Unconstrained),
            Some(FilterDescriptor::Single(single)) => {
                self.compile_single(single).map(|fragment| match fragment {
                    Fragment::Predicate(predicate) => CompiledFilter::Match(predicate.to_document()),
                    Fragment::Anchor(geo) => CompiledFilter::Anchored(geo),
                })
            }
            Some(FilterDescriptor::Combined(combined)) => self.compile_combined(combined),
        };

        match &compiled {
            Ok(filter) => tracing::debug!(anchored = filter.is_anchored(), "compiled filter"),
            Err(error) => tracing::warn!(%error, "rejected filter"),
        }
        compiled
    }

    /// Standard ordered pipeline: filter, sort, skip, limit, projection.
    #[must_use]
    pub fn assemble(
        &self,
        filter: CompiledFilter,
        sort: Option<SortSpec>,
        window: Window,
    ) -> Pipeline {
        PipelineBuilder::from_filter(filter)
            .sort(sort)
            .window(window)
            .exclude(&self.config.exclude_fields)
            .build()
    }

    /// Parse, compile and assemble a full query envelope.
    ///
    /// # Errors
    ///
    /// Any [`FilterError`] from the filter, sort or page payloads.
    pub fn pipeline_for(&self, params: &QueryParams) -> Result<Pipeline, FilterError> {
        let interpretation = params.interpret()?;
        let descriptor = params.descriptor()?;
        let filter = self.compile(descriptor.as_ref())?;
        Ok(self.assemble(filter, interpretation.sort.clone(), interpretation.window()))
    }
}
