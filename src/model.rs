//! Data models for the bookstore catalog
//!
//! This module defines the persisted entity records, the whole-catalog
//! document they live in, the create/update request payloads, and the
//! expansion token set used by read endpoints.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The whole catalog, persisted as one JSON document
///
/// Each field is the ordered list of records for one entity type. The
/// document is the unit of persistence: every mutation reads it, changes it
/// in memory, and writes it back wholesale.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CatalogDocument {
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub publishers: Vec<Publisher>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub books: Vec<Book>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub coupons: Vec<Coupon>,
}

impl CatalogDocument {
    pub fn author(&self, id: &str) -> Option<&Author> {
        self.authors.iter().find(|a| a.id == id)
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn publisher(&self, id: &str) -> Option<&Publisher> {
        self.publishers.iter().find(|p| p.id == id)
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn book(&self, id: &str) -> Option<&Book> {
        self.books.iter().find(|b| b.id == id)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Author {
    pub id: String,
    pub name: String,
    pub biography: Option<String>,
    pub nationality: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Publisher {
    pub id: String,
    pub name: String,
    pub foundation_year: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A registered user
///
/// `password` is persisted verbatim but must never leave the store in a
/// response; read paths go through [`public_user_value`].
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    /// Unique across users (trimmed, case-sensitive)
    pub email: String,
    pub password: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Book {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: f64,
    pub file: Option<String>,
    pub author_id: String,
    pub category_id: Option<String>,
    pub publisher_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Review {
    pub id: String,
    /// 1 to 5 inclusive
    pub rating: u8,
    pub comment: Option<String>,
    pub user_id: String,
    pub book_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OrderItem {
    pub book_id: String,
    pub quantity: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub items: Vec<OrderItem>,
    /// Sum of item book price times quantity, snapshotted at creation.
    /// Never recomputed, even when a referenced book's price changes.
    pub total: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Coupon {
    pub id: String,
    /// Stored upper-cased; unique case-insensitively
    pub code: String,
    pub discount_percentage: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Serializes a user with the password field stripped
///
/// Used for every user read, including users embedded through expansion.
pub fn public_user_value(user: &User) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(user)?;
    if let Some(map) = value.as_object_mut() {
        map.remove("password");
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Create payloads
//
// Required fields are still Option here: presence is checked by the store so
// that a missing field yields the same error shape as an out-of-range one,
// instead of a deserializer rejection.
// ---------------------------------------------------------------------------

#[derive(Deserialize, Debug, Default)]
pub struct NewAuthor {
    pub name: Option<String>,
    pub biography: Option<String>,
    pub nationality: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct NewCategory {
    pub name: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct NewPublisher {
    pub name: Option<String>,
    pub foundation_year: Option<i32>,
}

#[derive(Deserialize, Debug, Default)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct NewBook {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub file: Option<String>,
    pub author_id: Option<String>,
    pub category_id: Option<String>,
    pub publisher_id: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct NewReview {
    pub rating: Option<i64>,
    pub comment: Option<String>,
    pub user_id: Option<String>,
    pub book_id: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct NewOrderItem {
    pub book_id: Option<String>,
    /// Defaults to 1 when absent
    pub quantity: Option<u32>,
}

#[derive(Deserialize, Debug, Default)]
pub struct NewOrder {
    pub user_id: Option<String>,
    pub items: Option<Vec<NewOrderItem>>,
    pub status: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct NewCoupon {
    pub code: Option<String>,
    pub discount_percentage: Option<f64>,
}

// ---------------------------------------------------------------------------
// Update payloads
//
// Partial semantics: an absent field leaves the record unchanged. Nullable
// fields use the double-option pattern so an explicit `null` (clear the
// field) is distinguishable from the field not being sent at all.
// ---------------------------------------------------------------------------

/// Deserializer for patch fields: wraps the parsed value (including an
/// explicit JSON `null`) in `Some`, so `None` only ever means "absent".
pub fn patch_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Deserialize, Debug, Default)]
pub struct AuthorPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "patch_field")]
    pub biography: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub nationality: Option<Option<String>>,
}

#[derive(Deserialize, Debug, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct PublisherPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "patch_field")]
    pub foundation_year: Option<Option<i32>>,
}

#[derive(Deserialize, Debug, Default)]
pub struct UserPatch {
    #[serde(default, deserialize_with = "patch_field")]
    pub name: Option<Option<String>>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "patch_field")]
    pub password: Option<Option<String>>,
}

#[derive(Deserialize, Debug, Default)]
pub struct BookPatch {
    #[serde(default, deserialize_with = "patch_field")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub description: Option<Option<String>>,
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "patch_field")]
    pub file: Option<Option<String>>,
    pub author_id: Option<String>,
    /// Explicit `null` clears the relation; absent leaves it unchanged
    #[serde(default, deserialize_with = "patch_field")]
    pub category_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub publisher_id: Option<Option<String>>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ReviewPatch {
    pub rating: Option<i64>,
    #[serde(default, deserialize_with = "patch_field")]
    pub comment: Option<Option<String>>,
    pub user_id: Option<String>,
    pub book_id: Option<String>,
}

/// Order items and total are frozen at creation; only the status moves.
#[derive(Deserialize, Debug, Default)]
pub struct OrderPatch {
    pub status: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct CouponPatch {
    pub code: Option<String>,
    pub discount_percentage: Option<f64>,
}

// ---------------------------------------------------------------------------
// Expansion
// ---------------------------------------------------------------------------

/// Query parameters accepted by list and get endpoints
#[derive(Deserialize, Debug, Default)]
pub struct ReadParams {
    /// Comma-separated relation names, e.g. `author,category`
    pub expand: Option<String>,
}

impl ReadParams {
    pub fn expansions(&self) -> Expansions {
        Expansions::parse(self.expand.as_deref())
    }
}

/// The set of relation names requested by a read operation
///
/// Tokens are split on commas and trimmed. Unrecognized names are carried
/// but never consulted, which makes them ignored rather than an error.
#[derive(Debug, Clone, Default)]
pub struct Expansions(HashSet<String>);

impl Expansions {
    pub fn parse(raw: Option<&str>) -> Self {
        let tokens = raw
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        Expansions(tokens)
    }

    pub fn wants(&self, relation: &str) -> bool {
        self.0.contains(relation)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
