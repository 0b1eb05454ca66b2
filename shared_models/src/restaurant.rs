use docfilter::{
    Accumulated, ApiError, Combinator, CombinedFilter, Document, DocumentStore, FilterCompiler,
    FilterDescriptor, ListResponse, PipelineBuilder, QueryParams, QueryResource, SingleFilter,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::to_document;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Address {
    pub building: String,
    /// `[lng, lat]`
    pub coord: Vec<f64>,
    pub street: String,
    pub zipcode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Grade {
    /// ISO-8601 inspection date
    pub date: String,
    pub grade: String,
    pub score: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Restaurant {
    pub address: Address,
    pub borough: String,
    pub cuisine: String,
    #[serde(default)]
    pub grades: Vec<Grade>,
    pub name: String,
    pub restaurant_id: String,
}

impl Restaurant {
    #[must_use]
    pub fn to_document(&self) -> Document {
        to_document(self)
    }
}

pub struct Restaurants;

impl QueryResource for Restaurants {
    const COLLECTION: &'static str = "restaurants";
    const RESOURCE_NAME: &'static str = "Restaurant";
    const KEY_FIELD: &'static str = "restaurant_id";

    /// Distinct names carry every location and cuisine a chain has.
    fn distinct_extras(field: &str) -> Vec<Accumulated> {
        if field != "name" {
            return Vec::new();
        }
        vec![
            Accumulated::add_to_set("borough", "borough"),
            Accumulated::add_to_set("cuisine", "cuisine"),
            Accumulated::add_to_set("street", "address.street"),
            Accumulated::add_to_set("coord", "address.coord"),
        ]
    }
}

impl Restaurants {
    /// Restaurants between `min_distance` (when given) and `max_distance`
    /// metres of `(lng, lat)`, nearest first unless the request sorts otherwise. The request filter narrows
    /// the result; a combined filter keeps its own combinator.
    ///
    /// # Errors
    ///
    /// `422` when the request already carries a proximity filter or is invalid.
    pub async fn nearest<S>(
        store: &S,
        compiler: &FilterCompiler,
        lng: f64,
        lat: f64,
        min_distance: Option<f64>,
        max_distance: f64,
        params: &QueryParams,
    ) -> Result<ListResponse, ApiError>
    where
        S: DocumentStore + ?Sized,
    {
        let near = match min_distance {
            Some(min_distance) => SingleFilter::within(lng, lat, min_distance, max_distance),
            None => SingleFilter::near(lng, lat, max_distance),
        };
        let descriptor = match params.descriptor()? {
            None => FilterDescriptor::Single(near),
            Some(FilterDescriptor::Single(single)) => FilterDescriptor::Combined(CombinedFilter::new(
                Combinator::And,
                vec![near, single],
            )),
            Some(FilterDescriptor::Combined(mut combined)) => {
                combined.elements.insert(0, near);
                FilterDescriptor::Combined(combined)
            }
        };

        let interpretation = params.interpret()?;
        let pipeline = PipelineBuilder::from_filter(compiler.compile(Some(&descriptor))?)
            .constrain(Self::list_constraint())
            .sort(interpretation.sort)
            .skip(interpretation.skip)
            .limit(interpretation.limit.or(compiler.config().default_list_limit))
            .exclude(&compiler.config().exclude_fields)
            .build();

        let data = store
            .aggregate(Self::COLLECTION, &pipeline.to_documents())
            .await?;
        tracing::debug!(rows = data.len(), ?min_distance, max_distance, "nearest restaurants");
        Ok(ListResponse {
            data,
            page_number: params.page.page_number,
        })
    }
}
