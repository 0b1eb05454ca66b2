use docfilter::{
    Accumulated, ApiError, Document, DocumentStore, QueryResource, store::geometry::centroid,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use utoipa::ToSchema;

use crate::{Geometry, to_document};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Neighborhood {
    pub geometry: Geometry,
    pub name: String,
}

impl Neighborhood {
    #[must_use]
    pub fn to_document(&self) -> Document {
        to_document(self)
    }
}

pub struct Neighborhoods;

impl QueryResource for Neighborhoods {
    const COLLECTION: &'static str = "neighborhoods";
    const RESOURCE_NAME: &'static str = "Neighborhood";
    const KEY_FIELD: &'static str = "name";
    const GEOMETRY_FIELD: Option<&'static str> = Some("geometry");

    fn distinct_extras(_field: &str) -> Vec<Accumulated> {
        vec![Accumulated::add_to_set("coord", "geometry.centroid")]
    }
}

const CENTROID_FIELD: &str = "geometry.centroid";

impl Neighborhoods {
    /// Store each neighborhood's polygon centre under `geometry.centroid`.
    /// Returns how many documents changed.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub async fn set_centroids<S>(store: &S) -> Result<u64, ApiError>
    where
        S: DocumentStore + ?Sized,
    {
        let mut modified = 0;
        for document in store.find(Self::COLLECTION, &Document::new()).await? {
            let (Some(id), Some(center)) = (
                document.get("_id"),
                document
                    .get("geometry")
                    .and_then(|geometry| geometry.get("coordinates"))
                    .and_then(centroid),
            ) else {
                tracing::warn!(name = ?document.get("name"), "neighborhood without usable geometry");
                continue;
            };
            let outcome = store
                .update_one(
                    Self::COLLECTION,
                    &by_id(id),
                    &mutation("$set", json!({ CENTROID_FIELD: center })),
                    false,
                )
                .await?;
            modified += outcome.modified;
        }
        tracing::debug!(modified, "centroids set");
        Ok(modified)
    }

    /// Remove every stored centroid.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub async fn unset_centroids<S>(store: &S) -> Result<u64, ApiError>
    where
        S: DocumentStore + ?Sized,
    {
        let outcome = store
            .update_many(
                Self::COLLECTION,
                &Document::new(),
                &mutation("$unset", json!({ CENTROID_FIELD: "" })),
                false,
            )
            .await?;
        Ok(outcome.modified)
    }
}

fn by_id(id: &Value) -> Document {
    let mut predicate = Document::new();
    predicate.insert("_id".to_string(), id.clone());
    predicate
}

fn mutation(operator: &str, fields: Value) -> Document {
    let mut document = Document::new();
    document.insert(operator.to_string(), fields);
    document
}
