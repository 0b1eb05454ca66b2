use serde_json::Value;

use super::compiler::CompiledFilter;
use super::descriptor::CombinedFilter;
use super::error::FilterError;
use super::operators::{Combinator, Operator};
use super::predicate::{Fragment, compile_single};
use crate::Document;
use crate::config::CompilerConfig;

/// `{"$and"|"$or"|"$nor": [fragments..]}`, or an empty (unconstrained) predicate when there are none.
#[must_use]
pub fn combine(combinator: Combinator, fragments: Vec<Document>) -> Document {
    let mut document = Document::new();
    if !fragments.is_empty() {
        document.insert(
            combinator.tag().to_string(),
            Value::Array(fragments.into_iter().map(Value::Object).collect()),
        );
    }
    document
}

/// AND two predicates together without nesting empty ones.
#[must_use]
pub fn conjoin(left: Document, right: Document) -> Document {
    match (left.is_empty(), right.is_empty()) {
        (true, _) => right,
        (_, true) => left,
        (false, false) => combine(Combinator::And, vec![left, right]),
    }
}

/// Compile a combined filter.
///
/// Without a proximity element the result is a match predicate joined under the
/// combinator. With one, the proximity stage becomes the anchor and the other
/// elements are folded into its embedded query under the same combinator.
///
/// # Errors
///
/// [`FilterError::MultipleGeoAnchors`] when more than one proximity element is
/// supplied, and any error from [`compile_single`].
pub fn compile_combined(
    filter: &CombinedFilter,
    config: &CompilerConfig,
) -> Result<CompiledFilter, FilterError> {
    let anchors = filter
        .elements
        .iter()
        .filter(|element| element.operator == Operator::GeoNear)
        .count();
    if anchors > 1 {
        return Err(FilterError::MultipleGeoAnchors { count: anchors });
    }

    let mut anchor = None;
    let mut fragments = Vec::with_capacity(filter.elements.len());
    for element in &filter.elements {
        match compile_single(element, config)? {
            Fragment::Anchor(geo) => anchor = Some(geo),
            Fragment::Predicate(predicate) => fragments.push(predicate.to_document()),
        }
    }

    Ok(match anchor {
        Some(mut geo) => {
            geo.fold(filter.combinator, fragments);
            CompiledFilter::Anchored(geo)
        }
        None => CompiledFilter::Match(combine(filter.combinator, fragments)),
    })
}
