// Create, update, field maintenance and delete through the shared resource operations

use axum::http::StatusCode;
use docfilter::{Document, DocumentStore, QueryResource};
use serde_json::{Value, json};
use shared_models::{Restaurant, Restaurants};

mod common;
use common::{compiler, params, setup_test_store};

fn doc(value: Value) -> Document {
    value.as_object().cloned().expect("object literal")
}

async fn find(store: &impl DocumentStore, id: &str) -> Option<Document> {
    store
        .find_one(Restaurants::COLLECTION, &doc(json!({"restaurant_id": id})))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_create_requires_the_key_field() {
    let store = setup_test_store().await;

    let err = Restaurants::create(store.as_ref(), &compiler(), doc(json!({"name": "Nameless"})))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

    let err = Restaurants::create(
        store.as_ref(),
        &compiler(),
        doc(json!({"name": "Null Key", "restaurant_id": null})),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(store.count(Restaurants::COLLECTION).await, 9);
}

#[tokio::test]
async fn test_create_returns_the_stored_document() {
    let store = setup_test_store().await;
    let created = Restaurants::create(
        store.as_ref(),
        &compiler(),
        doc(json!({
            "address": {"building": "7", "coord": [-73.99, 40.73], "street": "Broadway", "zipcode": "10003"},
            "borough": "Manhattan",
            "cuisine": "Pizza",
            "grades": [],
            "name": "Joe's",
            "restaurant_id": "r10"
        })),
    )
    .await
    .unwrap();
    assert!(!created.contains_key("_id"));

    // Round-trips into the typed model
    let typed: Restaurant = serde_json::from_value(Value::Object(created)).unwrap();
    assert_eq!(typed.name, "Joe's");
    assert_eq!(store.count(Restaurants::COLLECTION).await, 10);
    assert!(find(store.as_ref(), "r10").await.unwrap()["_id"].is_string());
}

#[tokio::test]
async fn test_update_one_by_key() {
    let store = setup_test_store().await;
    let updated = Restaurants::update_one(
        store.as_ref(),
        &compiler(),
        "r2",
        doc(json!({"cuisine": "Italian", "address.zipcode": "11224"})),
    )
    .await
    .unwrap();
    assert_eq!(updated["cuisine"], "Italian");
    assert_eq!(updated["address"]["zipcode"], "11224");
    assert_eq!(updated["address"]["street"], "Stillwell Avenue");
    assert!(!updated.contains_key("_id"));
}

#[tokio::test]
async fn test_update_one_can_change_the_key() {
    let store = setup_test_store().await;
    let updated = Restaurants::update_one(
        store.as_ref(),
        &compiler(),
        "r3",
        doc(json!({"restaurant_id": "r3-moved"})),
    )
    .await
    .unwrap();
    assert_eq!(updated["restaurant_id"], "r3-moved");
    assert_eq!(updated["name"], "Tov Kosher Kitchen");
    assert!(find(store.as_ref(), "r3").await.is_none());
}

#[tokio::test]
async fn test_update_one_failures() {
    let store = setup_test_store().await;

    let err = Restaurants::update_one(store.as_ref(), &compiler(), "missing", doc(json!({"cuisine": "Thai"})))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(err.to_string(), "Restaurant 'missing' not found");

    let err = Restaurants::update_one(store.as_ref(), &compiler(), "r1", Document::new())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

    // Update operators are not accepted as field names
    let err = Restaurants::update_one(store.as_ref(), &compiler(), "r1", doc(json!({"$inc": {"x": 1}})))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_set_field_on_matching_documents() {
    let store = setup_test_store().await;
    let queens = params(json!({"filters": {"field": "borough", "operator": "eq", "value": "Queens"}}));

    let summary = Restaurants::set_field(store.as_ref(), &compiler(), &queens, doc(json!({"inspected": true})))
        .await
        .unwrap();
    assert_eq!((summary.matched, summary.modified), (2, 2));
    assert_eq!(summary.field.as_deref(), Some("inspected"));
    assert_eq!(find(store.as_ref(), "r4").await.unwrap()["inspected"], true);

    // Nothing changes the second time
    let err = Restaurants::set_field(store.as_ref(), &compiler(), &queens, doc(json!({"inspected": true})))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_set_field_upserts_when_nothing_matches() {
    let store = setup_test_store().await;
    let request = params(json!({"filters": {"field": "restaurant_id", "operator": "eq", "value": "r99"}}));

    let summary = Restaurants::set_field(store.as_ref(), &compiler(), &request, doc(json!({"name": "Fresh Place"})))
        .await
        .unwrap();
    assert_eq!((summary.matched, summary.modified), (0, 1));

    let inserted = find(store.as_ref(), "r99").await.unwrap();
    assert_eq!(inserted["name"], "Fresh Place");
    assert_eq!(store.count(Restaurants::COLLECTION).await, 10);
}

#[tokio::test]
async fn test_rename_field_only_where_present() {
    let store = setup_test_store().await;
    let bronx = params(json!({"filters": {"field": "borough", "operator": "eq", "value": "Bronx"}}));

    let summary = Restaurants::rename_field(store.as_ref(), &compiler(), &bronx, "cuisine", "kitchen")
        .await
        .unwrap();
    assert_eq!(summary.modified, 2);
    assert_eq!(summary.field.as_deref(), Some("kitchen"));

    let bakery = find(store.as_ref(), "r7").await.unwrap();
    assert_eq!(bakery["kitchen"], "Bakery");
    assert!(!bakery.contains_key("cuisine"));

    // Already renamed: the existence check leaves nothing to do
    let err = Restaurants::rename_field(store.as_ref(), &compiler(), &bronx, "cuisine", "kitchen")
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

    let err = Restaurants::rename_field(store.as_ref(), &compiler(), &bronx, "name", "name")
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unset_field() {
    let store = setup_test_store().await;
    let carvel = params(json!({"filters": {"field": "restaurant_id", "operator": "eq", "value": "r9"}}));

    let summary = Restaurants::unset_field(store.as_ref(), &compiler(), &carvel, "grades")
        .await
        .unwrap();
    assert_eq!(summary.modified, 1);
    assert!(!find(store.as_ref(), "r9").await.unwrap().contains_key("grades"));

    let err = Restaurants::unset_field(store.as_ref(), &compiler(), &carvel, "grades")
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_by_key() {
    let store = setup_test_store().await;

    let summary = Restaurants::delete_by_key(store.as_ref(), "r9").await.unwrap();
    assert_eq!(summary.key, "r9");
    assert_eq!(summary.deleted, 1);
    assert_eq!(store.count(Restaurants::COLLECTION).await, 8);

    let err = Restaurants::delete_by_key(store.as_ref(), "r9").await.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
}
