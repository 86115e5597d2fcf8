//! Route definitions for the catalog API
//!
//! Maps each collection to its CRUD handlers and mounts everything under
//! `/api`.

use axum::routing::get;
use axum::Router;

use crate::database::AppState;
use crate::handler::{
    create_author, create_book, create_category, create_coupon, create_order, create_publisher,
    create_review, create_user, delete_author, delete_book, delete_category, delete_coupon,
    delete_order, delete_publisher, delete_review, delete_user, get_author, get_book,
    get_category, get_coupon, get_order, get_publisher, get_review, get_user, list_authors,
    list_books, list_categories, list_coupons, list_orders, list_publishers, list_reviews,
    list_users, update_author, update_book, update_category, update_coupon, update_order,
    update_publisher, update_review, update_user,
};

/// Creates and configures the Axum application router with all routes
///
/// Every collection follows the same shape:
///
/// - `GET /api/{collection}` - list records (`?expand=` where supported)
/// - `POST /api/{collection}` - create a record
/// - `GET /api/{collection}/{id}` - fetch one record
/// - `PUT /api/{collection}/{id}` - partial update
/// - `DELETE /api/{collection}/{id}` - delete (guarded for book-referenced types)
pub fn create_app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/authors", get(list_authors).post(create_author))
        .route(
            "/authors/{id}",
            get(get_author).put(update_author).delete(delete_author),
        )
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
        .route("/publishers", get(list_publishers).post(create_publisher))
        .route(
            "/publishers/{id}",
            get(get_publisher)
                .put(update_publisher)
                .delete(delete_publisher),
        )
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/books", get(list_books).post(create_book))
        .route(
            "/books/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/reviews", get(list_reviews).post(create_review))
        .route(
            "/reviews/{id}",
            get(get_review).put(update_review).delete(delete_review),
        )
        .route("/orders", get(list_orders).post(create_order))
        .route(
            "/orders/{id}",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/coupons", get(list_coupons).post(create_coupon))
        .route(
            "/coupons/{id}",
            get(get_coupon).put(update_coupon).delete(delete_coupon),
        );

    Router::new()
        // Mount all collection routes under /api
        .nest("/api", api_routes)
        // Inject the application state into all handlers
        .with_state(state)
}
