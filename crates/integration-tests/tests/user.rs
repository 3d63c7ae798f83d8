//! Account, sign-in and session behavior over the full router.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use cookbook_core::{Account, RecipePage, ShoppingList};
use cookbook_integration_tests::{
    Auth, FakeIdentity, GOOGLE_CODE, GOOGLE_EMAIL, GOOGLE_SUB, TestApp, VALID_RECAPTCHA,
};
use cookbook_server::db::Store;
use cookbook_server::session::Session;

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();
    assert_eq!(app.get("/health", Auth::Anonymous).await.status, StatusCode::OK);
    assert_eq!(
        app.get("/health/ready", Auth::Anonymous).await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_demo_sign_up_logs_in_with_seeded_recipes() {
    let app = TestApp::new();

    let response = app
        .post(
            "/api/user",
            Auth::Anonymous,
            json!({"isDemoUser": true, "recaptchaToken": VALID_RECAPTCHA}),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    let account: Account = response.json();

    let session = response.cookie_pair("session").unwrap();
    assert_eq!(
        response.cookie_pair("isAuthenticated").as_deref(),
        Some("isAuthenticated=true")
    );
    assert!(
        app.images
            .calls()
            .contains(&format!("create_folder:cookbook/demo/{}", account.id))
    );

    let page: RecipePage = app
        .get("/api/recipes?resource=recipes&limit=100", Auth::Cookie(&session))
        .await
        .json();
    assert!(!page.recipes.is_empty());

    let list: ShoppingList = app
        .get("/api/shopping-list", Auth::Cookie(&session))
        .await
        .json();
    assert_eq!(list.account_id, account.id);
}

#[tokio::test]
async fn test_bare_sign_up_creates_empty_account_without_session() {
    let app = TestApp::new();

    let response = app
        .post(
            "/api/user",
            Auth::Anonymous,
            json!({"recaptchaToken": VALID_RECAPTCHA}),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let account: Account = response.json();
    assert!(response.set_cookies().is_empty());

    let page: RecipePage = app
        .get("/api/recipes?resource=recipes", Auth::Token(&account.id))
        .await
        .json();
    assert!(page.recipes.is_empty());
}

#[tokio::test]
async fn test_sign_up_requires_verified_recaptcha() {
    let app = TestApp::new();

    let missing = app
        .post("/api/user", Auth::Anonymous, json!({"isDemoUser": true}))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let rejected = app
        .post(
            "/api/user",
            Auth::Anonymous,
            json!({"isDemoUser": true, "recaptchaToken": "bot"}),
        )
        .await;
    assert_eq!(rejected.status, StatusCode::FORBIDDEN);
    assert!(app.images.calls().is_empty());
}

#[tokio::test]
async fn test_google_sign_in_requires_registered_email() {
    let app = TestApp::new();

    let response = app
        .post("/api/user", Auth::Anonymous, json!({"googleCode": GOOGLE_CODE}))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.text(), "User verification failed.");
    assert!(response.set_cookies().is_empty());
}

#[tokio::test]
async fn test_google_sign_in_with_bad_code_is_refused() {
    let app = TestApp::new();
    app.google_account().await;

    let response = app
        .post("/api/user", Auth::Anonymous, json!({"googleCode": "stolen"}))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_google_sign_in_sets_a_working_session() {
    let app = TestApp::new();
    let registered = app.google_account().await;

    let response = app
        .post("/api/user", Auth::Anonymous, json!({"googleCode": GOOGLE_CODE}))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    let account: Account = response.json();
    assert_eq!(account.id, registered.id);

    let user = account.users.first().unwrap();
    assert_eq!(user.email.as_ref().unwrap().as_str(), GOOGLE_EMAIL);
    assert_eq!(user.google_id.as_deref(), Some(GOOGLE_SUB));
    assert_eq!(user.first_name.as_deref(), Some("Ada"));

    let session = response.cookie_pair("session").unwrap();
    let me = app
        .get(
            &format!("/api/user?id={}", account.id),
            Auth::Cookie(&session),
        )
        .await;
    assert_eq!(me.status, StatusCode::OK);
    assert!(me.set_cookies().is_empty());
}

#[tokio::test]
async fn test_expiring_google_session_is_refreshed() {
    let app = TestApp::new();
    let registered = app.google_account().await;
    app.post("/api/user", Auth::Anonymous, json!({"googleCode": GOOGLE_CODE}))
        .await;

    let mut tokens = FakeIdentity::tokens(GOOGLE_SUB);
    tokens.expires_in = chrono::Utc::now().timestamp_millis() - 1;
    let cookie = format!("session={}", Session::Google(tokens).encode());

    let response = app
        .get(
            &format!("/api/user?id={}", registered.id),
            Auth::Cookie(&cookie),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let refreshed = response.cookie_pair("session").unwrap();
    let Session::Google(tokens) = Session::decode(refreshed.trim_start_matches("session="))
        .unwrap()
    else {
        panic!("expected a google session");
    };
    assert!(tokens.expires_in > chrono::Utc::now().timestamp_millis());
}

#[tokio::test]
async fn test_session_with_extreme_expiry_is_refreshed() {
    let app = TestApp::new();
    let registered = app.google_account().await;
    app.post("/api/user", Auth::Anonymous, json!({"googleCode": GOOGLE_CODE}))
        .await;

    let mut tokens = FakeIdentity::tokens(GOOGLE_SUB);
    tokens.expires_in = i64::MIN;
    let cookie = format!("session={}", Session::Google(tokens).encode());

    let response = app
        .get(
            &format!("/api/user?id={}", registered.id),
            Auth::Cookie(&cookie),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.cookie_pair("session").is_some());
}

#[tokio::test]
async fn test_unknown_google_subject_is_anonymous() {
    let app = TestApp::new();
    let account = app.account().await;

    let cookie = format!(
        "session={}",
        Session::Google(FakeIdentity::tokens("nobody")).encode()
    );
    let response = app
        .get(&format!("/api/user?id={}", account.id), Auth::Cookie(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_expires_cookies() {
    let app = TestApp::new();

    let response = app.get("/api/user?logout=true", Auth::Anonymous).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "OK");

    let cookies = response.set_cookies();
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    assert_eq!(
        response.cookie_pair("isAuthenticated").as_deref(),
        Some("isAuthenticated=false")
    );
}

#[tokio::test]
async fn test_account_access_is_owner_only() {
    let app = TestApp::new();
    let alice = app.account().await;
    let bob = app.account().await;
    let uri = format!("/api/user?id={}", alice.id);

    assert_eq!(
        app.get("/api/user", Auth::Token(&alice.id)).await.status,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        app.get(&uri, Auth::Anonymous).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.get(&uri, Auth::Token(&bob.id)).await.status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.delete(&uri, Auth::Token(&bob.id)).await.status,
        StatusCode::FORBIDDEN
    );

    let me: Account = app.get(&uri, Auth::Token(&alice.id)).await.json();
    assert_eq!(me.id, alice.id);
}

#[tokio::test]
async fn test_missing_account_is_not_found() {
    let app = TestApp::new();
    let ghost = cookbook_core::AccountId::new("ghost");

    let response = app
        .get("/api/user?id=ghost", Auth::Token(&ghost))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_account_removes_everything() {
    let app = TestApp::new();
    let response = app
        .post(
            "/api/user",
            Auth::Anonymous,
            json!({"isDemoUser": true, "recaptchaToken": VALID_RECAPTCHA}),
        )
        .await;
    let account: Account = response.json();
    let auth = Auth::Token(&account.id);
    let list: ShoppingList = app.get("/api/shopping-list", auth).await.json();

    let deleted = app
        .delete(&format!("/api/user?id={}", account.id), auth)
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.text(), "User deleted.");

    assert!(app.store.get_account(&account.id).await.unwrap().is_none());
    assert!(
        app.store
            .get_shopping_list(&list.id)
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(app.store.tag_count(&account.id).await, 0);
    assert!(
        app.images
            .calls()
            .contains(&format!("delete_folder:cookbook/demo/{}", account.id))
    );

    let again = app
        .get(&format!("/api/user?id={}", account.id), auth)
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}
