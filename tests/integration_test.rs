//! Integration tests for the bookstore catalog API
//!
//! These tests verify the entire application stack including:
//! - HTTP routing
//! - Request/response handling
//! - Referential integrity rules
//! - Error handling

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tower::ServiceExt;

// Import from the main crate
use bookstore::database::{init_db, AppState};
use bookstore::route::create_app;
use bookstore::store::CatalogStore;

/// Helper function to create a test application with a temporary database
fn setup_test_app() -> (axum::Router, NamedTempFile) {
    // Create a temporary database file
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = temp_db.path().to_str().unwrap();

    // Initialize database
    let db = init_db(db_path).expect("Failed to initialize test database");
    let state = AppState {
        store: Arc::new(CatalogStore::new(db)),
    };

    // Create the app
    let app = create_app(state);

    (app, temp_db)
}

/// Helper function to parse response body as JSON
async fn response_json(body: Body) -> Value {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

/// Sends one request through the router and returns the response
async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(payload) => {
            builder = builder.header("content-type", "application/json");
            Body::from(payload.to_string())
        }
        None => Body::empty(),
    };

    app.clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

/// Creates a record and returns its generated ID
async fn create(app: &axum::Router, uri: &str, payload: Value) -> String {
    let response = send(app, "POST", uri, Some(payload)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response.into_body()).await;
    body["id"].as_str().expect("created record has an id").to_string()
}

#[tokio::test]
async fn test_create_author_success() {
    let (app, _temp_db) = setup_test_app();

    let response = send(
        &app,
        "POST",
        "/api/authors",
        Some(json!({
            "name": "Ursula K. Le Guin",
            "nationality": "American"
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["name"], "Ursula K. Le Guin");
    assert_eq!(body["nationality"], "American");
    assert_eq!(body["biography"], Value::Null);
    assert!(body["id"].as_str().unwrap().len() == 12);
    assert!(body["created_at"].is_string());
    assert_eq!(body["updated_at"], Value::Null);
}

#[tokio::test]
async fn test_create_author_requires_name() {
    let (app, _temp_db) = setup_test_app();

    let response = send(&app, "POST", "/api/authors", Some(json!({}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["code"], "invalid_field");

    // Blank names are rejected the same way
    let response = send(&app, "POST", "/api/authors", Some(json!({"name": "  "}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_book_with_unknown_author_rejected() {
    let (app, _temp_db) = setup_test_app();

    let response = send(
        &app,
        "POST",
        "/api/books",
        Some(json!({
            "price": 9.99,
            "author_id": "does-not-exist"
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["code"], "dangling_reference");
    assert!(body["error"].as_str().unwrap().contains("author_id"));

    // The rejected create must leave the store unchanged
    let response = send(&app, "GET", "/api/books", None).await;
    let body = response_json(response.into_body()).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_book_requires_price_and_rejects_negative() {
    let (app, _temp_db) = setup_test_app();

    let author_id = create(&app, "/api/authors", json!({"name": "A. Writer"})).await;

    let response = send(
        &app,
        "POST",
        "/api/books",
        Some(json!({"author_id": author_id})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        "/api/books",
        Some(json!({"author_id": author_id, "price": -1.0})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        "/api/books",
        Some(json!({"author_id": author_id, "price": 0.0})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_delete_author_blocked_while_book_references_it() {
    let (app, _temp_db) = setup_test_app();

    let author_id = create(&app, "/api/authors", json!({"name": "Blocked Author"})).await;
    let book_id = create(
        &app,
        "/api/books",
        json!({"title": "Held", "price": 5.0, "author_id": author_id}),
    )
    .await;

    // Delete is refused while the book exists
    let response = send(&app, "DELETE", &format!("/api/authors/{}", author_id), None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["code"], "referenced_by_other");

    // The author is untouched
    let response = send(&app, "GET", &format!("/api/authors/{}", author_id), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Remove the book, then the delete goes through
    let response = send(&app, "DELETE", &format!("/api/books/{}", book_id), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, "DELETE", &format!("/api/authors/{}", author_id), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, "GET", &format!("/api/authors/{}", author_id), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_category_blocked_while_book_references_it() {
    let (app, _temp_db) = setup_test_app();

    let author_id = create(&app, "/api/authors", json!({"name": "Some Author"})).await;
    let category_id = create(&app, "/api/categories", json!({"name": "Fantasy"})).await;
    create(
        &app,
        "/api/books",
        json!({"price": 12.0, "author_id": author_id, "category_id": category_id}),
    )
    .await;

    let response = send(
        &app,
        "DELETE",
        &format!("/api/categories/{}", category_id),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["code"], "referenced_by_other");
}

#[tokio::test]
async fn test_user_email_uniqueness() {
    let (app, _temp_db) = setup_test_app();

    let first_id = create(
        &app,
        "/api/users",
        json!({"name": "First", "email": "dup@example.com"}),
    )
    .await;

    // Same email after trimming collides
    let response = send(
        &app,
        "POST",
        "/api/users",
        Some(json!({"email": "  dup@example.com  "})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["code"], "already_exists");

    // Updating another user onto the taken email also collides
    let second_id = create(&app, "/api/users", json!({"email": "other@example.com"})).await;
    let response = send(
        &app,
        "PUT",
        &format!("/api/users/{}", second_id),
        Some(json!({"email": "dup@example.com"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // A user writing its own email back to itself is fine
    let response = send(
        &app,
        "PUT",
        &format!("/api/users/{}", first_id),
        Some(json!({"email": "dup@example.com"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_user_password_never_exposed() {
    let (app, _temp_db) = setup_test_app();

    let response = send(
        &app,
        "POST",
        "/api/users",
        Some(json!({
            "name": "Secret Keeper",
            "email": "secret@example.com",
            "password": "hunter2"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response.into_body()).await;
    let user_id = body["id"].as_str().unwrap().to_string();
    assert!(body.get("password").is_none());
    assert_eq!(body["email"], "secret@example.com");

    // Direct read
    let response = send(&app, "GET", &format!("/api/users/{}", user_id), None).await;
    let body = response_json(response.into_body()).await;
    assert!(body.get("password").is_none());

    // List read
    let response = send(&app, "GET", "/api/users", None).await;
    let body = response_json(response.into_body()).await;
    assert!(body[0].get("password").is_none());
}

#[tokio::test]
async fn test_review_expansion_strips_embedded_user_password() {
    let (app, _temp_db) = setup_test_app();

    let user_id = create(
        &app,
        "/api/users",
        json!({"email": "reviewer@example.com", "password": "hunter2"}),
    )
    .await;
    let author_id = create(&app, "/api/authors", json!({"name": "Reviewed Author"})).await;
    let book_id = create(
        &app,
        "/api/books",
        json!({"price": 20.0, "author_id": author_id}),
    )
    .await;
    let review_id = create(
        &app,
        "/api/reviews",
        json!({"rating": 4, "comment": "solid", "user_id": user_id, "book_id": book_id}),
    )
    .await;

    let response = send(
        &app,
        "GET",
        &format!("/api/reviews/{}?expand=user,book", review_id),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["user"]["email"], "reviewer@example.com");
    assert!(body["user"].get("password").is_none());
    assert_eq!(body["book"]["id"], book_id.as_str());
}

#[tokio::test]
async fn test_review_rating_must_be_in_range() {
    let (app, _temp_db) = setup_test_app();

    let user_id = create(&app, "/api/users", json!({"email": "r@example.com"})).await;
    let author_id = create(&app, "/api/authors", json!({"name": "Rated"})).await;
    let book_id = create(
        &app,
        "/api/books",
        json!({"price": 8.0, "author_id": author_id}),
    )
    .await;

    for rating in [0, 6] {
        let response = send(
            &app,
            "POST",
            "/api/reviews",
            Some(json!({"rating": rating, "user_id": user_id, "book_id": book_id})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response_json(response.into_body()).await;
        assert_eq!(body["code"], "invalid_field");
    }

    let response = send(
        &app,
        "POST",
        "/api/reviews",
        Some(json!({"rating": 5, "user_id": user_id, "book_id": book_id})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_order_total_is_snapshotted_at_creation() {
    let (app, _temp_db) = setup_test_app();

    let user_id = create(&app, "/api/users", json!({"email": "buyer@example.com"})).await;
    let author_id = create(&app, "/api/authors", json!({"name": "Prolific"})).await;
    let b1 = create(
        &app,
        "/api/books",
        json!({"title": "One", "price": 10.0, "author_id": author_id}),
    )
    .await;
    let b2 = create(
        &app,
        "/api/books",
        json!({"title": "Two", "price": 5.0, "author_id": author_id}),
    )
    .await;

    // quantity defaults to 1 when omitted
    let response = send(
        &app,
        "POST",
        "/api/orders",
        Some(json!({
            "user_id": user_id,
            "items": [
                {"book_id": b1, "quantity": 2},
                {"book_id": b2}
            ]
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response.into_body()).await;
    let order_id = body["id"].as_str().unwrap().to_string();
    assert_eq!(body["total"], 25.0);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["items"][1]["quantity"], 1);

    // Raising the book price afterwards must not move the stored total
    let response = send(
        &app,
        "PUT",
        &format!("/api/books/{}", b1),
        Some(json!({"price": 100.0})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, "GET", &format!("/api/orders/{}", order_id), None).await;
    let body = response_json(response.into_body()).await;
    assert_eq!(body["total"], 25.0);
}

#[tokio::test]
async fn test_order_requires_items_and_valid_references() {
    let (app, _temp_db) = setup_test_app();

    let user_id = create(&app, "/api/users", json!({"email": "empty@example.com"})).await;

    let response = send(
        &app,
        "POST",
        "/api/orders",
        Some(json!({"user_id": user_id, "items": []})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        "/api/orders",
        Some(json!({
            "user_id": user_id,
            "items": [{"book_id": "missing-book"}]
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["code"], "dangling_reference");

    // Nothing was persisted by the rejected creates
    let response = send(&app, "GET", "/api/orders", None).await;
    let body = response_json(response.into_body()).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_list_books_with_expansion() {
    let (app, _temp_db) = setup_test_app();

    let author_id = create(&app, "/api/authors", json!({"name": "Expanded"})).await;
    let category_id = create(&app, "/api/categories", json!({"name": "Sci-Fi"})).await;
    create(
        &app,
        "/api/books",
        json!({"title": "With Category", "price": 1.0, "author_id": author_id, "category_id": category_id}),
    )
    .await;
    create(
        &app,
        "/api/books",
        json!({"title": "Without Category", "price": 2.0, "author_id": author_id}),
    )
    .await;

    let response = send(&app, "GET", "/api/books?expand=author,category", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response.into_body()).await;
    let books = body.as_array().unwrap();
    assert_eq!(books.len(), 2);
    assert_eq!(books[0]["author"]["name"], "Expanded");
    assert_eq!(books[0]["category"]["name"], "Sci-Fi");
    assert_eq!(books[1]["author"]["name"], "Expanded");
    // Unset optional relation expands to an explicit null
    assert_eq!(books[1]["category"], Value::Null);
    // Publisher was not requested, so the field is absent entirely
    assert!(books[1].get("publisher").is_none());

    // Expansion is additive only: a plain read carries no relation fields
    let response = send(&app, "GET", "/api/books", None).await;
    let body = response_json(response.into_body()).await;
    assert!(body[0].get("author").is_none());
    assert!(body[0].get("category").is_none());
}

#[tokio::test]
async fn test_unknown_expand_tokens_are_ignored() {
    let (app, _temp_db) = setup_test_app();

    let author_id = create(&app, "/api/authors", json!({"name": "Tolerant"})).await;
    create(
        &app,
        "/api/books",
        json!({"price": 3.0, "author_id": author_id}),
    )
    .await;

    let response = send(&app, "GET", "/api/books?expand=banana,author", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response.into_body()).await;
    assert_eq!(body[0]["author"]["name"], "Tolerant");
    assert!(body[0].get("banana").is_none());
}

#[tokio::test]
async fn test_update_book_null_clears_category_absent_keeps_it() {
    let (app, _temp_db) = setup_test_app();

    let author_id = create(&app, "/api/authors", json!({"name": "Patcher"})).await;
    let category_id = create(&app, "/api/categories", json!({"name": "Horror"})).await;
    let book_id = create(
        &app,
        "/api/books",
        json!({"price": 7.0, "author_id": author_id, "category_id": category_id}),
    )
    .await;

    // A patch without the field leaves the relation alone
    let response = send(
        &app,
        "PUT",
        &format!("/api/books/{}", book_id),
        Some(json!({"title": "Renamed"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["category_id"], category_id.as_str());

    // An explicit null clears it
    let response = send(
        &app,
        "PUT",
        &format!("/api/books/{}", book_id),
        Some(json!({"category_id": null})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["category_id"], Value::Null);

    // A non-empty value must resolve
    let response = send(
        &app,
        "PUT",
        &format!("/api/books/{}", book_id),
        Some(json!({"category_id": "nope"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["code"], "dangling_reference");
}

#[tokio::test]
async fn test_delete_nonexistent_returns_not_found() {
    let (app, _temp_db) = setup_test_app();

    for uri in [
        "/api/authors/ghost",
        "/api/books/ghost",
        "/api/users/ghost",
        "/api/coupons/ghost",
    ] {
        let response = send(&app, "DELETE", uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = response_json(response.into_body()).await;
        assert_eq!(body["code"], "not_found");
    }
}

#[tokio::test]
async fn test_delete_twice_returns_not_found_second_time() {
    let (app, _temp_db) = setup_test_app();

    let coupon_id = create(
        &app,
        "/api/coupons",
        json!({"code": "gone", "discount_percentage": 10}),
    )
    .await;

    let response = send(&app, "DELETE", &format!("/api/coupons/{}", coupon_id), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, "DELETE", &format!("/api/coupons/{}", coupon_id), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_coupon_code_upper_cased_and_unique_case_insensitively() {
    let (app, _temp_db) = setup_test_app();

    let response = send(
        &app,
        "POST",
        "/api/coupons",
        Some(json!({"code": "save10", "discount_percentage": 15.0})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["code"], "SAVE10");

    // Different casing of the same code collides
    let response = send(
        &app,
        "POST",
        "/api/coupons",
        Some(json!({"code": "Save10", "discount_percentage": 20.0})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["code"], "already_exists");
}

#[tokio::test]
async fn test_coupon_discount_range() {
    let (app, _temp_db) = setup_test_app();

    for discount in [0.0, -5.0, 100.5] {
        let response = send(
            &app,
            "POST",
            "/api/coupons",
            Some(json!({"code": "RANGE", "discount_percentage": discount})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = send(
        &app,
        "POST",
        "/api/coupons",
        Some(json!({"code": "RANGE", "discount_percentage": 100.0})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_update_sets_updated_at() {
    let (app, _temp_db) = setup_test_app();

    let author_id = create(&app, "/api/authors", json!({"name": "Before"})).await;

    let response = send(
        &app,
        "PUT",
        &format!("/api/authors/{}", author_id),
        Some(json!({"name": "After"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["name"], "After");
    assert!(body["updated_at"].is_string());
}

#[tokio::test]
async fn test_update_nonexistent_returns_not_found() {
    let (app, _temp_db) = setup_test_app();

    let response = send(
        &app,
        "PUT",
        "/api/publishers/ghost",
        Some(json!({"name": "Nobody"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_expansion_resolves_user_and_books() {
    let (app, _temp_db) = setup_test_app();

    let user_id = create(
        &app,
        "/api/users",
        json!({"email": "orders@example.com", "password": "pw"}),
    )
    .await;
    let author_id = create(&app, "/api/authors", json!({"name": "Ordered"})).await;
    let book_id = create(
        &app,
        "/api/books",
        json!({"title": "Line Item", "price": 4.0, "author_id": author_id}),
    )
    .await;
    let order_id = create(
        &app,
        "/api/orders",
        json!({"user_id": user_id, "items": [{"book_id": book_id, "quantity": 3}]}),
    )
    .await;

    let response = send(
        &app,
        "GET",
        &format!("/api/orders/{}?expand=user,book", order_id),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["user"]["email"], "orders@example.com");
    assert!(body["user"].get("password").is_none());
    assert_eq!(body["items"][0]["book"]["title"], "Line Item");
    assert_eq!(body["items"][0]["quantity"], 3);
}
