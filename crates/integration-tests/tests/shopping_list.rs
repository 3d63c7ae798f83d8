//! Shopping list endpoint behavior over the full router.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use cookbook_core::ShoppingList;
use cookbook_integration_tests::{Auth, TestApp};
use cookbook_server::db::Store;

#[tokio::test]
async fn test_list_is_created_on_first_read() {
    let app = TestApp::new();
    let account = app.store.create_account().await.unwrap();
    let auth = Auth::Token(&account.id);

    let first: ShoppingList = app.get("/api/shopping-list", auth).await.json();
    let second: ShoppingList = app.get("/api/shopping-list", auth).await.json();

    assert_eq!(first.account_id, account.id);
    assert!(first.items.is_empty());
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn test_requires_identity() {
    let app = TestApp::new();
    let response = app.get("/api/shopping-list", Auth::Anonymous).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_update_accepts_both_body_shapes() {
    let app = TestApp::new();
    let account = app.account().await;
    let auth = Auth::Token(&account.id);
    let list: ShoppingList = app.get("/api/shopping-list", auth).await.json();
    let uri = format!("/api/shopping-list?id={}", list.id);

    let wrapped: ShoppingList = app
        .put(
            &uri,
            auth,
            json!({"items": [{"name": "flour", "checked": false}]}),
        )
        .await
        .json();
    assert_eq!(wrapped.items.len(), 1);

    let bare: ShoppingList = app
        .put(
            &uri,
            auth,
            json!([{"name": "flour", "checked": true}, {"name": "eggs"}]),
        )
        .await
        .json();
    assert_eq!(bare.items.len(), 2);
    assert!(bare.items.first().unwrap().checked);
    assert!(!bare.items.last().unwrap().checked);

    let stored: ShoppingList = app.get("/api/shopping-list", auth).await.json();
    assert_eq!(stored, bare);
}

#[tokio::test]
async fn test_update_errors() {
    let app = TestApp::new();
    let alice = app.account().await;
    let bob = app.account().await;
    let alice_list: ShoppingList = app
        .get("/api/shopping-list", Auth::Token(&alice.id))
        .await
        .json();
    let items = json!([{"name": "milk"}]);

    let no_id = app
        .put("/api/shopping-list", Auth::Token(&bob.id), items.clone())
        .await;
    assert_eq!(no_id.status, StatusCode::BAD_REQUEST);

    let missing = app
        .put(
            "/api/shopping-list?id=no-such-list",
            Auth::Token(&bob.id),
            items.clone(),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let foreign = app
        .put(
            &format!("/api/shopping-list?id={}", alice_list.id),
            Auth::Token(&bob.id),
            items,
        )
        .await;
    assert_eq!(foreign.status, StatusCode::FORBIDDEN);

    let malformed = app
        .put(
            &format!("/api/shopping-list?id={}", alice_list.id),
            Auth::Token(&alice.id),
            json!({"name": "milk"}),
        )
        .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);

    let untouched: ShoppingList = app
        .get("/api/shopping-list", Auth::Token(&alice.id))
        .await
        .json();
    assert!(untouched.items.is_empty());
}

#[tokio::test]
async fn test_reachable_through_recipes_resource() {
    let app = TestApp::new();
    let account = app.account().await;
    let auth = Auth::Token(&account.id);

    let list: ShoppingList = app
        .get("/api/recipes?resource=shopping-list", auth)
        .await
        .json();

    let updated: ShoppingList = app
        .put(
            &format!("/api/recipes?resource=shopping-list&id={}", list.id),
            auth,
            json!({"items": [{"name": "butter", "checked": false}]}),
        )
        .await
        .json();
    assert_eq!(updated.id, list.id);
    assert_eq!(updated.items.first().unwrap().name, "butter");

    let unsupported = app
        .delete(
            &format!("/api/recipes?resource=shopping-list&id={}", list.id),
            auth,
        )
        .await;
    assert_eq!(unsupported.status, StatusCode::BAD_REQUEST);
}
