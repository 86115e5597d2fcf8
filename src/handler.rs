//! HTTP request handlers for the catalog API
//!
//! Each handler is a thin adapter: extract the path/query/body, call the
//! corresponding store operation, and wrap the result in a status code.
//! Error responses are produced centrally by `CatalogError::into_response`,
//! so no handler builds an error body by hand.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::database::AppState;
use crate::error::Result;
use crate::model::{
    AuthorPatch, BookPatch, CategoryPatch, CouponPatch, NewAuthor, NewBook, NewCategory,
    NewCoupon, NewOrder, NewPublisher, NewReview, NewUser, OrderPatch, PublisherPatch,
    ReadParams, ReviewPatch, UserPatch,
};

// -- authors ----------------------------------------------------------------

/// Creates a new author
///
/// # Response
///
/// - **201 Created** - the stored record, including its generated ID
/// - **400 Bad Request** - `name` missing or empty
pub async fn create_author(
    State(state): State<AppState>,
    Json(payload): Json<NewAuthor>,
) -> Result<impl IntoResponse> {
    let author = state.store.create_author(payload)?;
    Ok((StatusCode::CREATED, Json(author)))
}

pub async fn list_authors(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.store.list_authors()?))
}

pub async fn get_author(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.store.get_author(&id)?))
}

pub async fn update_author(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<AuthorPatch>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.store.update_author(&id, patch)?))
}

/// Deletes an author
///
/// # Response
///
/// - **204 No Content** - deleted
/// - **404 Not Found** - no author with this ID
/// - **409 Conflict** - a book still references this author
pub async fn delete_author(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    state.store.delete_author(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

// -- categories -------------------------------------------------------------

pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<NewCategory>,
) -> Result<impl IntoResponse> {
    let category = state.store.create_category(payload)?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.store.list_categories()?))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.store.get_category(&id)?))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<CategoryPatch>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.store.update_category(&id, patch)?))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    state.store.delete_category(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

// -- publishers -------------------------------------------------------------

pub async fn create_publisher(
    State(state): State<AppState>,
    Json(payload): Json<NewPublisher>,
) -> Result<impl IntoResponse> {
    let publisher = state.store.create_publisher(payload)?;
    Ok((StatusCode::CREATED, Json(publisher)))
}

pub async fn list_publishers(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.store.list_publishers()?))
}

pub async fn get_publisher(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.store.get_publisher(&id)?))
}

pub async fn update_publisher(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<PublisherPatch>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.store.update_publisher(&id, patch)?))
}

pub async fn delete_publisher(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    state.store.delete_publisher(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

// -- users ------------------------------------------------------------------

/// Creates a user; the response never includes the password field
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<NewUser>,
) -> Result<impl IntoResponse> {
    let user = state.store.create_user(payload)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.store.list_users()?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.store.get_user(&id)?))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<UserPatch>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.store.update_user(&id, patch)?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    state.store.delete_user(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

// -- books ------------------------------------------------------------------

pub async fn create_book(
    State(state): State<AppState>,
    Json(payload): Json<NewBook>,
) -> Result<impl IntoResponse> {
    let book = state.store.create_book(payload)?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Lists books, optionally expanding relations
///
/// # Query Parameters
///
/// - `expand` - comma-separated relation names out of `author`, `category`,
///   `publisher`; unknown names are ignored
pub async fn list_books(
    State(state): State<AppState>,
    Query(params): Query<ReadParams>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.store.list_books(&params.expansions())?))
}

pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ReadParams>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.store.get_book(&id, &params.expansions())?))
}

pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<BookPatch>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.store.update_book(&id, patch)?))
}

pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    state.store.delete_book(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

// -- reviews ----------------------------------------------------------------

pub async fn create_review(
    State(state): State<AppState>,
    Json(payload): Json<NewReview>,
) -> Result<impl IntoResponse> {
    let review = state.store.create_review(payload)?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn list_reviews(
    State(state): State<AppState>,
    Query(params): Query<ReadParams>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.store.list_reviews(&params.expansions())?))
}

pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ReadParams>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.store.get_review(&id, &params.expansions())?))
}

pub async fn update_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<ReviewPatch>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.store.update_review(&id, patch)?))
}

pub async fn delete_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    state.store.delete_review(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

// -- orders -----------------------------------------------------------------

pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<NewOrder>,
) -> Result<impl IntoResponse> {
    let order = state.store.create_order(payload)?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<ReadParams>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.store.list_orders(&params.expansions())?))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ReadParams>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.store.get_order(&id, &params.expansions())?))
}

pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<OrderPatch>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.store.update_order(&id, patch)?))
}

pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    state.store.delete_order(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

// -- coupons ----------------------------------------------------------------

pub async fn create_coupon(
    State(state): State<AppState>,
    Json(payload): Json<NewCoupon>,
) -> Result<impl IntoResponse> {
    let coupon = state.store.create_coupon(payload)?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

pub async fn list_coupons(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.store.list_coupons()?))
}

pub async fn get_coupon(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.store.get_coupon(&id)?))
}

pub async fn update_coupon(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<CouponPatch>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.store.update_coupon(&id, patch)?))
}

pub async fn delete_coupon(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    state.store.delete_coupon(&id)?;
    Ok(StatusCode::NO_CONTENT)
}
