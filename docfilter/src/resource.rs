use async_trait::async_trait;
use serde_json::{Value, json};

use crate::Document;
use crate::errors::ApiError;
use crate::filtering::{FilterCompiler, conjoin};
use crate::models::{DeleteSummary, ListResponse, QueryParams, UpdateSummary};
use crate::pipeline::{Accumulated, DistinctQuery, PipelineBuilder};
use crate::store::DocumentStore;

fn single(field: &str, value: Value) -> Document {
    let mut document = Document::new();
    document.insert(field.to_string(), value);
    document
}

fn strip(mut document: Document, fields: &[String]) -> Document {
    for field in fields {
        document.remove(field);
    }
    document
}

/// A collection exposed through the shared query operations.
///
/// Implementors only name their collection and fields; every operation has a
/// default implementation generic over the [`DocumentStore`].
#[async_trait]
pub trait QueryResource: Sized + Send + Sync {
    const COLLECTION: &'static str;
    const RESOURCE_NAME: &'static str;
    /// Field identifying a single document for update and delete
    const KEY_FIELD: &'static str;
    /// Documents with this field empty are left out of lists
    const REQUIRED_FIELD: Option<&'static str> = Some("name");
    /// GeoJSON geometry used by [`QueryResource::locate_point`]
    const GEOMETRY_FIELD: Option<&'static str> = None;

    /// Extra columns collected per group by distinct queries on `field`.
    #[must_use]
    fn distinct_extras(_field: &str) -> Vec<Accumulated> {
        Vec::new()
    }

    #[must_use]
    fn list_constraint() -> Document {
        Self::REQUIRED_FIELD.map_or_else(Document::new, |field| single(field, json!({"$ne": ""})))
    }

    /// Flat predicate from the request filter, for find/update/delete.
    ///
    /// # Errors
    ///
    /// `422` for an invalid or proximity filter.
    fn predicate(compiler: &FilterCompiler, params: &QueryParams) -> Result<Document, ApiError> {
        let descriptor = params.descriptor()?;
        Ok(compiler.compile(descriptor.as_ref())?.into_predicate()?)
    }

    /// First document matching the request, after sort and skip.
    async fn get_one<S>(
        store: &S,
        compiler: &FilterCompiler,
        params: &QueryParams,
    ) -> Result<Document, ApiError>
    where
        S: DocumentStore + ?Sized,
    {
        let interpretation = params.interpret()?;
        let descriptor = params.descriptor()?;
        let pipeline = PipelineBuilder::from_filter(compiler.compile(descriptor.as_ref())?)
            .sort(interpretation.sort)
            .skip(interpretation.skip)
            .limit(Some(1))
            .exclude(&compiler.config().exclude_fields)
            .build();

        store
            .aggregate(Self::COLLECTION, &pipeline.to_documents())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found(Self::RESOURCE_NAME, None))
    }

    async fn get_list<S>(
        store: &S,
        compiler: &FilterCompiler,
        params: &QueryParams,
    ) -> Result<ListResponse, ApiError>
    where
        S: DocumentStore + ?Sized,
    {
        let interpretation = params.interpret()?;
        let descriptor = params.descriptor()?;
        let limit = interpretation
            .limit
            .or(compiler.config().default_list_limit);
        let pipeline = PipelineBuilder::from_filter(compiler.compile(descriptor.as_ref())?)
            .constrain(Self::list_constraint())
            .sort(interpretation.sort)
            .skip(interpretation.skip)
            .limit(limit)
            .exclude(&compiler.config().exclude_fields)
            .build();

        let data = store
            .aggregate(Self::COLLECTION, &pipeline.to_documents())
            .await?;
        tracing::debug!(resource = Self::RESOURCE_NAME, rows = data.len(), "listed");
        Ok(ListResponse {
            data,
            page_number: params.page.page_number,
        })
    }

    /// Unique values of the field named by the request's sort.
    async fn get_distinct<S>(
        store: &S,
        compiler: &FilterCompiler,
        params: &QueryParams,
    ) -> Result<ListResponse, ApiError>
    where
        S: DocumentStore + ?Sized,
    {
        let query = DistinctQuery::from_sort(params.sort.as_ref())?;
        let extras = Self::distinct_extras(&query.field);
        let query = query.with_extras(extras);
        let window = params.page.window()?;
        let descriptor = params.descriptor()?;
        let pipeline = query.assemble(
            compiler.compile(descriptor.as_ref())?,
            window,
            &compiler.config().exclude_fields,
        );

        let data = store
            .aggregate(Self::COLLECTION, &pipeline.to_documents())
            .await?;
        Ok(ListResponse {
            data,
            page_number: params.page.page_number,
        })
    }

    async fn create<S>(
        store: &S,
        compiler: &FilterCompiler,
        document: Document,
    ) -> Result<Document, ApiError>
    where
        S: DocumentStore + ?Sized,
    {
        if document.get(Self::KEY_FIELD).is_none_or(Value::is_null) {
            return Err(ApiError::bad_request(format!(
                "{} requires `{}`",
                Self::RESOURCE_NAME,
                Self::KEY_FIELD
            )));
        }
        let stored = store.insert_one(Self::COLLECTION, document).await?;
        tracing::debug!(resource = Self::RESOURCE_NAME, "created");
        Ok(strip(stored, &compiler.config().exclude_fields))
    }

    /// Apply `changes` to the document whose key is `key` and return it.
    async fn update_one<S>(
        store: &S,
        compiler: &FilterCompiler,
        key: &str,
        changes: Document,
    ) -> Result<Document, ApiError>
    where
        S: DocumentStore + ?Sized,
    {
        if changes.is_empty() {
            return Err(ApiError::bad_request("No changes supplied"));
        }
        if let Some(field) = changes.keys().find(|field| field.starts_with('$')) {
            return Err(ApiError::bad_request(format!(
                "Field names cannot start with '$': {field}"
            )));
        }
        let new_key = changes
            .get(Self::KEY_FIELD)
            .and_then(Value::as_str)
            .unwrap_or(key)
            .to_string();

        let outcome = store
            .update_one(
                Self::COLLECTION,
                &single(Self::KEY_FIELD, json!(key)),
                &single("$set", Value::Object(changes)),
                false,
            )
            .await?;
        if outcome.matched == 0 {
            return Err(ApiError::not_found(Self::RESOURCE_NAME, Some(key.to_string())));
        }

        store
            .find_one(Self::COLLECTION, &single(Self::KEY_FIELD, json!(new_key)))
            .await?
            .map(|document| strip(document, &compiler.config().exclude_fields))
            .ok_or_else(|| ApiError::not_found(Self::RESOURCE_NAME, Some(new_key)))
    }

    /// Set field values on every matching document, inserting one when none match.
    async fn set_field<S>(
        store: &S,
        compiler: &FilterCompiler,
        params: &QueryParams,
        values: Document,
    ) -> Result<UpdateSummary, ApiError>
    where
        S: DocumentStore + ?Sized,
    {
        if values.is_empty() {
            return Err(ApiError::bad_request("No values supplied"));
        }
        let field = values.keys().cloned().collect::<Vec<_>>().join(", ");
        let predicate = Self::predicate(compiler, params)?;
        let outcome = store
            .update_many(
                Self::COLLECTION,
                &predicate,
                &single("$set", Value::Object(values)),
                true,
            )
            .await?;
        summarize::<Self>(field, outcome)
    }

    /// Rename `field` to `new_field` on matching documents that have it.
    async fn rename_field<S>(
        store: &S,
        compiler: &FilterCompiler,
        params: &QueryParams,
        field: &str,
        new_field: &str,
    ) -> Result<UpdateSummary, ApiError>
    where
        S: DocumentStore + ?Sized,
    {
        if field.is_empty() || new_field.is_empty() || field == new_field {
            return Err(ApiError::bad_request(format!(
                "Cannot rename `{field}` to `{new_field}`"
            )));
        }
        let predicate = conjoin(
            Self::predicate(compiler, params)?,
            single(field, json!({"$exists": true})),
        );
        let outcome = store
            .update_many(
                Self::COLLECTION,
                &predicate,
                &single("$rename", json!({ field: new_field })),
                false,
            )
            .await?;
        summarize::<Self>(new_field.to_string(), outcome)
    }

    async fn unset_field<S>(
        store: &S,
        compiler: &FilterCompiler,
        params: &QueryParams,
        field: &str,
    ) -> Result<UpdateSummary, ApiError>
    where
        S: DocumentStore + ?Sized,
    {
        let predicate = Self::predicate(compiler, params)?;
        let outcome = store
            .update_many(
                Self::COLLECTION,
                &predicate,
                &single("$unset", json!({ field: "" })),
                false,
            )
            .await?;
        summarize::<Self>(field.to_string(), outcome)
    }

    /// Delete every document whose key is `key`.
    async fn delete_by_key<S>(store: &S, key: &str) -> Result<DeleteSummary, ApiError>
    where
        S: DocumentStore + ?Sized,
    {
        let deleted = store
            .delete_many(Self::COLLECTION, &single(Self::KEY_FIELD, json!(key)))
            .await?;
        if deleted == 0 {
            return Err(ApiError::not_found(Self::RESOURCE_NAME, Some(key.to_string())));
        }
        tracing::debug!(resource = Self::RESOURCE_NAME, key, deleted, "deleted");
        Ok(DeleteSummary {
            key: key.to_string(),
            deleted,
        })
    }

    /// The document whose geometry contains `(lng, lat)`.
    async fn locate_point<S>(
        store: &S,
        compiler: &FilterCompiler,
        lng: f64,
        lat: f64,
    ) -> Result<Document, ApiError>
    where
        S: DocumentStore + ?Sized,
    {
        let Some(geometry) = Self::GEOMETRY_FIELD else {
            return Err(ApiError::bad_request(format!(
                "{} has no geometry",
                Self::RESOURCE_NAME
            )));
        };
        if !(-180.0..=180.0).contains(&lng) || !(-90.0..=90.0).contains(&lat) {
            return Err(ApiError::bad_request(format!(
                "Coordinates out of range: [{lng}, {lat}]"
            )));
        }

        let predicate = single(
            geometry,
            json!({"$geoIntersects": {"$geometry": {"type": "Point", "coordinates": [lng, lat]}}}),
        );
        store
            .find_one(Self::COLLECTION, &predicate)
            .await?
            .map(|document| strip(document, &compiler.config().exclude_fields))
            .ok_or_else(|| ApiError::not_found(Self::RESOURCE_NAME, None))
    }
}

fn summarize<R: QueryResource>(
    field: String,
    outcome: crate::store::UpdateOutcome,
) -> Result<UpdateSummary, ApiError> {
    if outcome.modified == 0 {
        return Err(ApiError::not_found(R::RESOURCE_NAME, None));
    }
    tracing::debug!(
        resource = R::RESOURCE_NAME,
        field = %field,
        matched = outcome.matched,
        modified = outcome.modified,
        "updated"
    );
    Ok(UpdateSummary {
        field: Some(field),
        matched: outcome.matched,
        modified: outcome.modified,
    })
}
