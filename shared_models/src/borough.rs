use docfilter::{Document, QueryResource};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{Geometry, to_document};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Borough {
    pub geometry: Geometry,
    pub name: String,
}

impl Borough {
    #[must_use]
    pub fn to_document(&self) -> Document {
        to_document(self)
    }
}

pub struct Boroughs;

impl QueryResource for Boroughs {
    const COLLECTION: &'static str = "boroughs";
    const RESOURCE_NAME: &'static str = "Borough";
    const KEY_FIELD: &'static str = "name";
    const GEOMETRY_FIELD: Option<&'static str> = Some("geometry");
}
