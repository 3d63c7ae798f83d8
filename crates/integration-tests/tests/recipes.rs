//! Recipe endpoint behavior over the full router.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::{Value, json};

use cookbook_core::{Recipe, RecipeId, RecipePage, RecipeSummary};
use cookbook_integration_tests::{Auth, TestApp};

fn recipe_body(title: &str, tags: &[&str]) -> Value {
    json!({
        "title": title,
        "category": "Dessert",
        "cookTime": 30,
        "servings": "4",
        "ingredients": "flour\nsugar",
        "steps": "mix\nbake",
        "tags": tags.iter().map(|name| json!({"name": name})).collect::<Vec<_>>(),
    })
}

async fn create(app: &TestApp, auth: Auth<'_>, title: &str, tags: &[&str]) -> Recipe {
    let response = app
        .post("/api/recipes?resource=recipes", auth, recipe_body(title, tags))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    response.json()
}

#[tokio::test]
async fn test_requires_identity() {
    let app = TestApp::new();
    let response = app
        .get("/api/recipes?resource=recipes", Auth::Anonymous)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_or_unknown_resource_is_bad_request() {
    let app = TestApp::new();
    let account = app.account().await;

    let missing = app.get("/api/recipes", Auth::Token(&account.id)).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let unknown = app
        .get("/api/recipes?resource=orders", Auth::Token(&account.id))
        .await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_accounts_never_see_each_other() {
    let app = TestApp::new();
    let alice = app.account().await;
    let bob = app.account().await;

    let recipe = create(&app, Auth::Token(&alice.id), "Apple pie", &[]).await;

    let page: RecipePage = app
        .get("/api/recipes?resource=recipes", Auth::Token(&bob.id))
        .await
        .json();
    assert!(page.recipes.is_empty());

    let detail = app
        .get(
            &format!("/api/recipes?resource=recipes&id={}", recipe.id),
            Auth::Token(&bob.id),
        )
        .await;
    assert_eq!(detail.status, StatusCode::NOT_FOUND);

    let selection: Vec<RecipeSummary> = app
        .get(
            "/api/recipes?resource=recipes&mode=selection",
            Auth::Token(&bob.id),
        )
        .await
        .json();
    assert!(selection.is_empty());
}

#[tokio::test]
async fn test_search_matches_any_word() {
    let app = TestApp::new();
    let account = app.account().await;
    let auth = Auth::Token(&account.id);

    create(&app, auth, "Apple pie", &[]).await;
    create(&app, auth, "Pear tart", &[]).await;
    create(&app, auth, "Banana bread", &[]).await;

    let page: RecipePage = app
        .get("/api/recipes?resource=recipes&search=apple%20pear", auth)
        .await
        .json();
    let mut titles: Vec<String> = page.recipes.into_iter().map(|r| r.title).collect();
    titles.sort();
    assert_eq!(titles, ["Apple pie", "Pear tart"]);

    let prefix: RecipePage = app
        .get("/api/recipes?resource=recipes&search=ban", auth)
        .await
        .json();
    assert_eq!(prefix.recipes.len(), 1);
}

#[tokio::test]
async fn test_category_filter() {
    let app = TestApp::new();
    let account = app.account().await;
    let auth = Auth::Token(&account.id);

    create(&app, auth, "Apple pie", &[]).await;
    let mut soup = recipe_body("Lentil soup", &[]);
    soup["category"] = json!("Soup");
    app.post("/api/recipes?resource=recipes", auth, soup).await;

    let page: RecipePage = app
        .get("/api/recipes?resource=recipes&category=Soup", auth)
        .await
        .json();
    assert_eq!(page.recipes.len(), 1);
    assert_eq!(page.recipes.first().unwrap().title, "Lentil soup");
}

#[tokio::test]
async fn test_cursor_pagination_visits_every_recipe_once() {
    let app = TestApp::new();
    let account = app.account().await;
    let auth = Auth::Token(&account.id);

    for i in 0..7 {
        create(&app, auth, &format!("Recipe {i}"), &[]).await;
    }

    let mut seen: Vec<RecipeId> = Vec::new();
    let mut cursor: Option<RecipeId> = None;
    loop {
        let uri = match cursor {
            Some(c) => format!("/api/recipes?resource=recipes&limit=3&cursor={c}"),
            None => "/api/recipes?resource=recipes&limit=3".to_string(),
        };
        let page: RecipePage = app.get(&uri, auth).await.json();
        assert!(page.recipes.len() <= 3);
        seen.extend(page.recipes.iter().map(|r| r.id));
        match page.cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    assert_eq!(seen.len(), 7);
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_bad_id_is_bad_request() {
    let app = TestApp::new();
    let account = app.account().await;

    let response = app
        .get("/api/recipes?resource=recipes&id=abc", Auth::Token(&account.id))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_body_is_bad_request() {
    let app = TestApp::new();
    let account = app.account().await;
    let auth = Auth::Token(&account.id);

    let untitled = app
        .post("/api/recipes?resource=recipes", auth, json!({"title": "  "}))
        .await;
    assert_eq!(untitled.status, StatusCode::BAD_REQUEST);

    let missing = app
        .request(
            axum::http::Method::POST,
            "/api/recipes?resource=recipes",
            auth,
            None,
        )
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_reduces_tags_by_name() {
    let app = TestApp::new();
    let account = app.account().await;
    let auth = Auth::Token(&account.id);

    let recipe = create(&app, auth, "Apple pie", &["sweet", "baked", "fruit"]).await;
    assert_eq!(recipe.tags.len(), 3);

    let response = app
        .put(
            &format!("/api/recipes?resource=recipes&id={}", recipe.id),
            auth,
            recipe_body("Apple pie", &["fruit"]),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let updated: Recipe = response.json();
    let names: Vec<&str> = updated.tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["fruit"]);

    let fetched: Recipe = app
        .get(
            &format!("/api/recipes?resource=recipes&id={}", recipe.id),
            auth,
        )
        .await
        .json();
    assert_eq!(fetched.tags.len(), 1);
}

#[tokio::test]
async fn test_update_without_tags_keeps_them() {
    let app = TestApp::new();
    let account = app.account().await;
    let auth = Auth::Token(&account.id);

    let recipe = create(&app, auth, "Apple pie", &["sweet"]).await;
    let updated: Recipe = app
        .put(
            &format!("/api/recipes?resource=recipes&id={}", recipe.id),
            auth,
            json!({"title": "Apple crumble", "cookTime": 25}),
        )
        .await
        .json();

    assert_eq!(updated.title, "Apple crumble");
    assert_eq!(updated.tags.len(), 1);
}

#[tokio::test]
async fn test_foreign_recipe_cannot_be_changed() {
    let app = TestApp::new();
    let alice = app.account().await;
    let bob = app.account().await;

    let recipe = create(&app, Auth::Token(&alice.id), "Apple pie", &[]).await;
    let uri = format!("/api/recipes?resource=recipes&id={}", recipe.id);

    let update = app
        .put(&uri, Auth::Token(&bob.id), recipe_body("Stolen pie", &[]))
        .await;
    assert_eq!(update.status, StatusCode::FORBIDDEN);

    let delete = app.delete(&uri, Auth::Token(&bob.id)).await;
    assert_eq!(delete.status, StatusCode::FORBIDDEN);

    let still_there: Recipe = app.get(&uri, Auth::Token(&alice.id)).await.json();
    assert_eq!(still_there.title, "Apple pie");
}

#[tokio::test]
async fn test_deleted_recipe_is_gone() {
    let app = TestApp::new();
    let account = app.account().await;
    let auth = Auth::Token(&account.id);

    let recipe = create(&app, auth, "Apple pie", &[]).await;
    let uri = format!("/api/recipes?resource=recipes&id={}", recipe.id);

    let deleted = app.delete(&uri, auth).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.text(), "Recipe deleted.");

    assert_eq!(app.get(&uri, auth).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.delete(&uri, auth).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_images_are_cleaned_up() {
    let app = TestApp::new();
    let account = app.account().await;
    let auth = Auth::Token(&account.id);

    let mut body = recipe_body("Apple pie", &[]);
    body["imagePublicId"] = json!("cookbook/demo/pie-1");
    let recipe: Recipe = app
        .post("/api/recipes?resource=recipes", auth, body.clone())
        .await
        .json();
    let uri = format!("/api/recipes?resource=recipes&id={}", recipe.id);

    body["imagePublicId"] = json!("cookbook/demo/pie-2");
    app.put(&uri, auth, body).await;
    app.delete(&uri, auth).await;

    assert_eq!(
        app.images.calls(),
        [
            "destroy_image:cookbook/demo/pie-1",
            "destroy_image:cookbook/demo/pie-2"
        ]
    );
}

#[tokio::test]
async fn test_selection_returns_at_most_three() {
    let app = TestApp::new();
    let account = app.account().await;
    let auth = Auth::Token(&account.id);

    for i in 0..5 {
        create(&app, auth, &format!("Recipe {i}"), &[]).await;
    }

    let selection: Vec<RecipeSummary> = app
        .get("/api/recipes?resource=recipes&mode=selection", auth)
        .await
        .json();
    assert_eq!(selection.len(), 3);
}

#[tokio::test]
async fn test_generate_seeds_bundled_recipes() {
    let app = TestApp::new();
    let account = app.account().await;
    let auth = Auth::Token(&account.id);

    let generated: Value = app
        .post(
            "/api/recipes?resource=recipes&mode=generate",
            auth,
            json!({}),
        )
        .await
        .json();
    let created = generated["created"].as_u64().unwrap();
    assert!(created > 0);

    let page: RecipePage = app
        .get("/api/recipes?resource=recipes&limit=100", auth)
        .await
        .json();
    assert_eq!(page.recipes.len() as u64, created);
}
