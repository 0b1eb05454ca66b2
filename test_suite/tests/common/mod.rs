#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    routing::{delete, post, put},
};
use docfilter::{
    ApiError, CompilerConfig, DeleteSummary, Document, FilterCompiler, ListResponse, MemoryStore,
    QueryParams, QueryResource,
};
use serde::Deserialize;
use serde_json::{Value, json};
use shared_models::{Borough, Boroughs, Neighborhood, Neighborhoods, Restaurant, Restaurants};
use tower::ServiceExt;

pub mod fixtures;

pub use fixtures::{TIMES_SQUARE, boroughs, neighborhoods, restaurants};

/// Route library logs to the test harness output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Store seeded with every fixture, geo fields registered as the restaurant
/// and neighborhood collections index them.
pub async fn setup_test_store() -> Arc<MemoryStore> {
    init_tracing();
    let store = MemoryStore::new()
        .with_geo_index(Restaurants::COLLECTION, "address.coord")
        .with_geo_index(Neighborhoods::COLLECTION, "geometry");
    store
        .seed(
            Restaurants::COLLECTION,
            restaurants().iter().map(Restaurant::to_document),
        )
        .await;
    store
        .seed(
            Neighborhoods::COLLECTION,
            neighborhoods().iter().map(Neighborhood::to_document),
        )
        .await;
    store
        .seed(Boroughs::COLLECTION, boroughs().iter().map(Borough::to_document))
        .await;
    Arc::new(store)
}

pub fn compiler() -> FilterCompiler {
    FilterCompiler::new(CompilerConfig::default())
}

/// Build a request envelope from JSON.
pub fn params(value: Value) -> QueryParams {
    serde_json::from_value(value).expect("valid query params")
}

/// Values of `field` across rows, as strings.
pub fn column(rows: &[Document], field: &str) -> Vec<String> {
    rows.iter()
        .map(|row| {
            row.get(field)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// HTTP surface used by the api tests
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MemoryStore>,
    pub compiler: FilterCompiler,
}

#[derive(Deserialize)]
struct ParamsBody {
    #[serde(default)]
    params: QueryParams,
}

#[derive(Deserialize)]
struct KeyBody {
    id: String,
    #[serde(default)]
    changes: Document,
}

#[derive(Deserialize)]
struct Coord {
    longitude: f64,
    latitude: f64,
}

#[derive(Deserialize)]
struct PointBody {
    coord: Coord,
}

async fn one<R: QueryResource>(
    State(state): State<AppState>,
    Json(body): Json<ParamsBody>,
) -> Result<Json<Document>, ApiError> {
    R::get_one(state.store.as_ref(), &state.compiler, &body.params)
        .await
        .map(Json)
}

async fn list<R: QueryResource>(
    State(state): State<AppState>,
    Json(body): Json<ParamsBody>,
) -> Result<Json<ListResponse>, ApiError> {
    R::get_list(state.store.as_ref(), &state.compiler, &body.params)
        .await
        .map(Json)
}

async fn distinct<R: QueryResource>(
    State(state): State<AppState>,
    Json(body): Json<ParamsBody>,
) -> Result<Json<ListResponse>, ApiError> {
    R::get_distinct(state.store.as_ref(), &state.compiler, &body.params)
        .await
        .map(Json)
}

async fn update<R: QueryResource>(
    State(state): State<AppState>,
    Json(body): Json<KeyBody>,
) -> Result<Json<Document>, ApiError> {
    R::update_one(state.store.as_ref(), &state.compiler, &body.id, body.changes)
        .await
        .map(Json)
}

async fn remove<R: QueryResource>(
    State(state): State<AppState>,
    Json(body): Json<KeyBody>,
) -> Result<Json<DeleteSummary>, ApiError> {
    R::delete_by_key(state.store.as_ref(), &body.id).await.map(Json)
}

async fn contain<R: QueryResource>(
    State(state): State<AppState>,
    Json(body): Json<PointBody>,
) -> Result<Json<Document>, ApiError> {
    R::locate_point(
        state.store.as_ref(),
        &state.compiler,
        body.coord.longitude,
        body.coord.latitude,
    )
    .await
    .map(Json)
}

fn resource_routes<R: QueryResource + 'static>() -> Router<AppState> {
    Router::new()
        .route("/one", post(one::<R>))
        .route("/list", post(list::<R>))
        .route("/distinct", post(distinct::<R>))
        .route("/contain", post(contain::<R>))
        .route("/update", put(update::<R>))
        .route("/delete", delete(remove::<R>))
}

pub fn setup_test_app(store: Arc<MemoryStore>) -> Router {
    Router::new()
        .nest("/restaurants", resource_routes::<Restaurants>())
        .nest("/neighborhoods", resource_routes::<Neighborhoods>())
        .nest("/boroughs", resource_routes::<Boroughs>())
        .with_state(AppState {
            store,
            compiler: compiler(),
        })
}

/// Send a JSON request and decode the JSON response.
pub async fn send(app: &Router, method: &str, uri: &str, body: &Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| json!(String::from_utf8_lossy(&bytes)))
    };
    (status, value)
}
