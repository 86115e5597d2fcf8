//! The catalog store
//!
//! All reads and writes go through [`CatalogStore`], which owns the embedded
//! database and enforces the integrity rules:
//!
//! - reference fields must resolve before a record is created or updated,
//! - authors, categories and publishers cannot be deleted while a book
//!   references them,
//! - unique fields (user email, coupon code) are checked after normalization,
//! - read operations can expand relations into the response on demand.
//!
//! Every mutation is a full read-modify-write of the catalog document inside
//! a single write transaction, so validation failures leave the persisted
//! state untouched and concurrent writers cannot interleave.

use chrono::Utc;
use rand::{distr::Alphanumeric, Rng};
use redb::{Database, ReadableDatabase, ReadableTable};
use serde_json::Value;
use tracing::{debug, warn};

use crate::database::{DOCUMENT_KEY, TABLE_CATALOG};
use crate::error::{CatalogError, Result};
use crate::model::{
    public_user_value, Author, AuthorPatch, Book, BookPatch, CatalogDocument, Category,
    CategoryPatch, Coupon, CouponPatch, Expansions, NewAuthor, NewBook, NewCategory, NewCoupon,
    NewOrder, NewPublisher, NewReview, NewUser, Order, OrderItem, OrderPatch, Publisher,
    PublisherPatch, Review, ReviewPatch, User, UserPatch,
};

/// Length of generated record IDs
const ID_LEN: usize = 12;

/// Owns the embedded database and exposes every catalog operation
pub struct CatalogStore {
    db: Database,
}

impl CatalogStore {
    pub fn new(db: Database) -> Self {
        CatalogStore { db }
    }

    /// Loads the current catalog document with a read transaction
    fn document(&self) -> Result<CatalogDocument> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_CATALOG)?;
        match table.get(DOCUMENT_KEY)? {
            Some(guard) => Ok(serde_json::from_str(guard.value())?),
            None => Ok(CatalogDocument::default()),
        }
    }

    /// Runs `op` against the document inside one write transaction
    ///
    /// The document is only written back when `op` succeeds; any error drops
    /// the transaction, so operations are all-or-nothing.
    fn mutate<T>(&self, op: impl FnOnce(&mut CatalogDocument) -> Result<T>) -> Result<T> {
        let write_txn = self.db.begin_write()?;
        let outcome;
        {
            let mut table = write_txn.open_table(TABLE_CATALOG)?;
            let raw = table.get(DOCUMENT_KEY)?.map(|guard| guard.value().to_string());
            let mut doc = match raw {
                Some(json) => serde_json::from_str(&json)?,
                None => CatalogDocument::default(),
            };
            outcome = op(&mut doc)?;
            let json = serde_json::to_string(&doc)?;
            table.insert(DOCUMENT_KEY, json.as_str())?;
        }
        write_txn.commit()?;
        Ok(outcome)
    }

    // -- authors ------------------------------------------------------------

    pub fn create_author(&self, payload: NewAuthor) -> Result<Author> {
        let NewAuthor {
            name,
            biography,
            nationality,
        } = payload;
        let name = required_text("name", name)?;

        let author = self.mutate(move |doc| {
            let author = Author {
                id: fresh_id(&doc.authors, |a| a.id.as_str()),
                name,
                biography,
                nationality,
                created_at: Utc::now(),
                updated_at: None,
            };
            doc.authors.push(author.clone());
            Ok(author)
        })?;
        debug!(id = %author.id, "created author");
        Ok(author)
    }

    pub fn list_authors(&self) -> Result<Vec<Author>> {
        Ok(self.document()?.authors)
    }

    pub fn get_author(&self, id: &str) -> Result<Author> {
        self.document()?
            .author(id)
            .cloned()
            .ok_or_else(|| not_found("author", id))
    }

    pub fn update_author(&self, id: &str, patch: AuthorPatch) -> Result<Author> {
        let AuthorPatch {
            name,
            biography,
            nationality,
        } = patch;
        if let Some(name) = &name {
            non_empty("name", name)?;
        }

        self.mutate(move |doc| {
            let author = doc
                .authors
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or_else(|| not_found("author", id))?;
            let mut changed = false;
            if let Some(name) = name {
                author.name = name;
                changed = true;
            }
            if let Some(biography) = biography {
                author.biography = biography;
                changed = true;
            }
            if let Some(nationality) = nationality {
                author.nationality = nationality;
                changed = true;
            }
            if changed {
                author.updated_at = Some(Utc::now());
            }
            Ok(author.clone())
        })
    }

    /// Deletes an author unless a book still references it
    pub fn delete_author(&self, id: &str) -> Result<()> {
        self.mutate(|doc| {
            let idx = doc
                .authors
                .iter()
                .position(|a| a.id == id)
                .ok_or_else(|| not_found("author", id))?;
            if doc.books.iter().any(|b| b.author_id == id) {
                warn!(%id, "delete refused: author still referenced by a book");
                return Err(CatalogError::ReferencedByOther {
                    entity: "author",
                    id: id.to_string(),
                    referenced_by: "book",
                });
            }
            doc.authors.remove(idx);
            Ok(())
        })
    }

    // -- categories ---------------------------------------------------------

    pub fn create_category(&self, payload: NewCategory) -> Result<Category> {
        let name = required_text("name", payload.name)?;

        let category = self.mutate(move |doc| {
            let category = Category {
                id: fresh_id(&doc.categories, |c| c.id.as_str()),
                name,
                created_at: Utc::now(),
                updated_at: None,
            };
            doc.categories.push(category.clone());
            Ok(category)
        })?;
        debug!(id = %category.id, "created category");
        Ok(category)
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.document()?.categories)
    }

    pub fn get_category(&self, id: &str) -> Result<Category> {
        self.document()?
            .category(id)
            .cloned()
            .ok_or_else(|| not_found("category", id))
    }

    pub fn update_category(&self, id: &str, patch: CategoryPatch) -> Result<Category> {
        if let Some(name) = &patch.name {
            non_empty("name", name)?;
        }

        self.mutate(move |doc| {
            let category = doc
                .categories
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| not_found("category", id))?;
            if let Some(name) = patch.name {
                category.name = name;
                category.updated_at = Some(Utc::now());
            }
            Ok(category.clone())
        })
    }

    pub fn delete_category(&self, id: &str) -> Result<()> {
        self.mutate(|doc| {
            let idx = doc
                .categories
                .iter()
                .position(|c| c.id == id)
                .ok_or_else(|| not_found("category", id))?;
            if doc.books.iter().any(|b| b.category_id.as_deref() == Some(id)) {
                warn!(%id, "delete refused: category still referenced by a book");
                return Err(CatalogError::ReferencedByOther {
                    entity: "category",
                    id: id.to_string(),
                    referenced_by: "book",
                });
            }
            doc.categories.remove(idx);
            Ok(())
        })
    }

    // -- publishers ---------------------------------------------------------

    pub fn create_publisher(&self, payload: NewPublisher) -> Result<Publisher> {
        let NewPublisher {
            name,
            foundation_year,
        } = payload;
        let name = required_text("name", name)?;

        let publisher = self.mutate(move |doc| {
            let publisher = Publisher {
                id: fresh_id(&doc.publishers, |p| p.id.as_str()),
                name,
                foundation_year,
                created_at: Utc::now(),
                updated_at: None,
            };
            doc.publishers.push(publisher.clone());
            Ok(publisher)
        })?;
        debug!(id = %publisher.id, "created publisher");
        Ok(publisher)
    }

    pub fn list_publishers(&self) -> Result<Vec<Publisher>> {
        Ok(self.document()?.publishers)
    }

    pub fn get_publisher(&self, id: &str) -> Result<Publisher> {
        self.document()?
            .publisher(id)
            .cloned()
            .ok_or_else(|| not_found("publisher", id))
    }

    pub fn update_publisher(&self, id: &str, patch: PublisherPatch) -> Result<Publisher> {
        let PublisherPatch {
            name,
            foundation_year,
        } = patch;
        if let Some(name) = &name {
            non_empty("name", name)?;
        }

        self.mutate(move |doc| {
            let publisher = doc
                .publishers
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| not_found("publisher", id))?;
            let mut changed = false;
            if let Some(name) = name {
                publisher.name = name;
                changed = true;
            }
            if let Some(foundation_year) = foundation_year {
                publisher.foundation_year = foundation_year;
                changed = true;
            }
            if changed {
                publisher.updated_at = Some(Utc::now());
            }
            Ok(publisher.clone())
        })
    }

    pub fn delete_publisher(&self, id: &str) -> Result<()> {
        self.mutate(|doc| {
            let idx = doc
                .publishers
                .iter()
                .position(|p| p.id == id)
                .ok_or_else(|| not_found("publisher", id))?;
            if doc
                .books
                .iter()
                .any(|b| b.publisher_id.as_deref() == Some(id))
            {
                warn!(%id, "delete refused: publisher still referenced by a book");
                return Err(CatalogError::ReferencedByOther {
                    entity: "publisher",
                    id: id.to_string(),
                    referenced_by: "book",
                });
            }
            doc.publishers.remove(idx);
            Ok(())
        })
    }

    // -- users --------------------------------------------------------------

    /// Creates a user; the returned value has the password stripped
    pub fn create_user(&self, payload: NewUser) -> Result<Value> {
        let NewUser {
            name,
            email,
            password,
        } = payload;
        let email = required_text("email", email)?.trim().to_string();

        let user = self.mutate(move |doc| {
            ensure_unique_email(&doc.users, &email, None)?;
            let user = User {
                id: fresh_id(&doc.users, |u| u.id.as_str()),
                name,
                email,
                password,
                created_at: Utc::now(),
                updated_at: None,
            };
            doc.users.push(user.clone());
            Ok(user)
        })?;
        debug!(id = %user.id, "created user");
        Ok(public_user_value(&user)?)
    }

    pub fn list_users(&self) -> Result<Vec<Value>> {
        self.document()?
            .users
            .iter()
            .map(|u| Ok(public_user_value(u)?))
            .collect()
    }

    pub fn get_user(&self, id: &str) -> Result<Value> {
        let doc = self.document()?;
        let user = doc.user(id).ok_or_else(|| not_found("user", id))?;
        Ok(public_user_value(user)?)
    }

    pub fn update_user(&self, id: &str, patch: UserPatch) -> Result<Value> {
        let UserPatch {
            name,
            email,
            password,
        } = patch;
        let email = email
            .map(|e| {
                let trimmed = e.trim().to_string();
                non_empty("email", &trimmed).map(|_| trimmed)
            })
            .transpose()?;

        let user = self.mutate(move |doc| {
            let idx = doc
                .users
                .iter()
                .position(|u| u.id == id)
                .ok_or_else(|| not_found("user", id))?;
            if let Some(email) = &email {
                // The record being updated is excluded, so writing a user's
                // own email back to itself is not a collision.
                ensure_unique_email(&doc.users, email, Some(id))?;
            }
            let user = &mut doc.users[idx];
            let mut changed = false;
            if let Some(name) = name {
                user.name = name;
                changed = true;
            }
            if let Some(email) = email {
                user.email = email;
                changed = true;
            }
            if let Some(password) = password {
                user.password = password;
                changed = true;
            }
            if changed {
                user.updated_at = Some(Utc::now());
            }
            Ok(user.clone())
        })?;
        Ok(public_user_value(&user)?)
    }

    /// User deletion is unconditional: no other entity type blocks it
    pub fn delete_user(&self, id: &str) -> Result<()> {
        self.mutate(|doc| {
            let idx = doc
                .users
                .iter()
                .position(|u| u.id == id)
                .ok_or_else(|| not_found("user", id))?;
            doc.users.remove(idx);
            Ok(())
        })
    }

    // -- books --------------------------------------------------------------

    pub fn create_book(&self, payload: NewBook) -> Result<Book> {
        let NewBook {
            title,
            description,
            price,
            file,
            author_id,
            category_id,
            publisher_id,
        } = payload;
        let price = match price {
            Some(p) => validate_price(p)?,
            None => return Err(required("price")),
        };
        let author_id = required_text("author_id", author_id)?;
        // Empty-string references behave like absent ones
        let category_id = category_id.filter(|id| !id.is_empty());
        let publisher_id = publisher_id.filter(|id| !id.is_empty());

        let book = self.mutate(move |doc| {
            if doc.author(&author_id).is_none() {
                return Err(dangling("author_id", &author_id));
            }
            if let Some(cid) = &category_id {
                if doc.category(cid).is_none() {
                    return Err(dangling("category_id", cid));
                }
            }
            if let Some(pid) = &publisher_id {
                if doc.publisher(pid).is_none() {
                    return Err(dangling("publisher_id", pid));
                }
            }
            let book = Book {
                id: fresh_id(&doc.books, |b| b.id.as_str()),
                title,
                description,
                price,
                file,
                author_id,
                category_id,
                publisher_id,
                created_at: Utc::now(),
                updated_at: None,
            };
            doc.books.push(book.clone());
            Ok(book)
        })?;
        debug!(id = %book.id, "created book");
        Ok(book)
    }

    pub fn list_books(&self, expand: &Expansions) -> Result<Vec<Value>> {
        let doc = self.document()?;
        doc.books.iter().map(|b| book_value(&doc, b, expand)).collect()
    }

    pub fn get_book(&self, id: &str, expand: &Expansions) -> Result<Value> {
        let doc = self.document()?;
        let book = doc.book(id).ok_or_else(|| not_found("book", id))?;
        book_value(&doc, book, expand)
    }

    pub fn update_book(&self, id: &str, patch: BookPatch) -> Result<Book> {
        let BookPatch {
            title,
            description,
            price,
            file,
            author_id,
            category_id,
            publisher_id,
        } = patch;
        let price = price.map(validate_price).transpose()?;
        if let Some(author_id) = &author_id {
            non_empty("author_id", author_id)?;
        }
        // An explicit null (or empty string) clears the relation; absent
        // leaves it unchanged; anything else must resolve below.
        let category_id = category_id.map(|inner| inner.filter(|id| !id.is_empty()));
        let publisher_id = publisher_id.map(|inner| inner.filter(|id| !id.is_empty()));

        self.mutate(move |doc| {
            let idx = doc
                .books
                .iter()
                .position(|b| b.id == id)
                .ok_or_else(|| not_found("book", id))?;
            if let Some(aid) = &author_id {
                if doc.author(aid).is_none() {
                    return Err(dangling("author_id", aid));
                }
            }
            if let Some(Some(cid)) = &category_id {
                if doc.category(cid).is_none() {
                    return Err(dangling("category_id", cid));
                }
            }
            if let Some(Some(pid)) = &publisher_id {
                if doc.publisher(pid).is_none() {
                    return Err(dangling("publisher_id", pid));
                }
            }
            let book = &mut doc.books[idx];
            let mut changed = false;
            if let Some(title) = title {
                book.title = title;
                changed = true;
            }
            if let Some(description) = description {
                book.description = description;
                changed = true;
            }
            if let Some(price) = price {
                book.price = price;
                changed = true;
            }
            if let Some(file) = file {
                book.file = file;
                changed = true;
            }
            if let Some(author_id) = author_id {
                book.author_id = author_id;
                changed = true;
            }
            if let Some(category_id) = category_id {
                book.category_id = category_id;
                changed = true;
            }
            if let Some(publisher_id) = publisher_id {
                book.publisher_id = publisher_id;
                changed = true;
            }
            if changed {
                book.updated_at = Some(Utc::now());
            }
            Ok(book.clone())
        })
    }

    /// Book deletion is unconditional; reviews and orders never block it
    pub fn delete_book(&self, id: &str) -> Result<()> {
        self.mutate(|doc| {
            let idx = doc
                .books
                .iter()
                .position(|b| b.id == id)
                .ok_or_else(|| not_found("book", id))?;
            doc.books.remove(idx);
            Ok(())
        })
    }

    // -- reviews ------------------------------------------------------------

    pub fn create_review(&self, payload: NewReview) -> Result<Review> {
        let NewReview {
            rating,
            comment,
            user_id,
            book_id,
        } = payload;
        let rating = match rating {
            Some(r) => validate_rating(r)?,
            None => return Err(required("rating")),
        };
        let user_id = required_text("user_id", user_id)?;
        let book_id = required_text("book_id", book_id)?;

        let review = self.mutate(move |doc| {
            if doc.user(&user_id).is_none() {
                return Err(dangling("user_id", &user_id));
            }
            if doc.book(&book_id).is_none() {
                return Err(dangling("book_id", &book_id));
            }
            let review = Review {
                id: fresh_id(&doc.reviews, |r| r.id.as_str()),
                rating,
                comment,
                user_id,
                book_id,
                created_at: Utc::now(),
                updated_at: None,
            };
            doc.reviews.push(review.clone());
            Ok(review)
        })?;
        debug!(id = %review.id, "created review");
        Ok(review)
    }

    pub fn list_reviews(&self, expand: &Expansions) -> Result<Vec<Value>> {
        let doc = self.document()?;
        doc.reviews
            .iter()
            .map(|r| review_value(&doc, r, expand))
            .collect()
    }

    pub fn get_review(&self, id: &str, expand: &Expansions) -> Result<Value> {
        let doc = self.document()?;
        let review = doc
            .reviews
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found("review", id))?;
        review_value(&doc, review, expand)
    }

    pub fn update_review(&self, id: &str, patch: ReviewPatch) -> Result<Review> {
        let ReviewPatch {
            rating,
            comment,
            user_id,
            book_id,
        } = patch;
        let rating = rating.map(validate_rating).transpose()?;
        if let Some(user_id) = &user_id {
            non_empty("user_id", user_id)?;
        }
        if let Some(book_id) = &book_id {
            non_empty("book_id", book_id)?;
        }

        self.mutate(move |doc| {
            let idx = doc
                .reviews
                .iter()
                .position(|r| r.id == id)
                .ok_or_else(|| not_found("review", id))?;
            if let Some(uid) = &user_id {
                if doc.user(uid).is_none() {
                    return Err(dangling("user_id", uid));
                }
            }
            if let Some(bid) = &book_id {
                if doc.book(bid).is_none() {
                    return Err(dangling("book_id", bid));
                }
            }
            let review = &mut doc.reviews[idx];
            let mut changed = false;
            if let Some(rating) = rating {
                review.rating = rating;
                changed = true;
            }
            if let Some(comment) = comment {
                review.comment = comment;
                changed = true;
            }
            if let Some(user_id) = user_id {
                review.user_id = user_id;
                changed = true;
            }
            if let Some(book_id) = book_id {
                review.book_id = book_id;
                changed = true;
            }
            if changed {
                review.updated_at = Some(Utc::now());
            }
            Ok(review.clone())
        })
    }

    pub fn delete_review(&self, id: &str) -> Result<()> {
        self.mutate(|doc| {
            let idx = doc
                .reviews
                .iter()
                .position(|r| r.id == id)
                .ok_or_else(|| not_found("review", id))?;
            doc.reviews.remove(idx);
            Ok(())
        })
    }

    // -- orders -------------------------------------------------------------

    /// Creates an order, snapshotting the total from current book prices
    pub fn create_order(&self, payload: NewOrder) -> Result<Order> {
        let NewOrder {
            user_id,
            items,
            status,
        } = payload;
        let user_id = required_text("user_id", user_id)?;
        let items = match items {
            Some(items) if !items.is_empty() => items,
            Some(_) => {
                return Err(CatalogError::InvalidField {
                    field: "items",
                    reason: "must contain at least one item".to_string(),
                })
            }
            None => return Err(required("items")),
        };
        let status = status.unwrap_or_else(|| "pending".to_string());

        let order = self.mutate(move |doc| {
            if doc.user(&user_id).is_none() {
                return Err(dangling("user_id", &user_id));
            }
            let mut total = 0.0;
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                let book_id = match item.book_id {
                    Some(id) if !id.trim().is_empty() => id,
                    _ => {
                        return Err(CatalogError::InvalidField {
                            field: "book_id",
                            reason: "is required for every order item".to_string(),
                        })
                    }
                };
                let quantity = item.quantity.unwrap_or(1);
                if quantity == 0 {
                    return Err(CatalogError::InvalidField {
                        field: "quantity",
                        reason: "must be at least 1".to_string(),
                    });
                }
                let book = doc
                    .book(&book_id)
                    .ok_or_else(|| dangling("book_id", &book_id))?;
                total += book.price * f64::from(quantity);
                resolved.push(OrderItem { book_id, quantity });
            }
            let order = Order {
                id: fresh_id(&doc.orders, |o| o.id.as_str()),
                user_id,
                items: resolved,
                total,
                status,
                created_at: Utc::now(),
                updated_at: None,
            };
            doc.orders.push(order.clone());
            Ok(order)
        })?;
        debug!(id = %order.id, total = order.total, "created order");
        Ok(order)
    }

    pub fn list_orders(&self, expand: &Expansions) -> Result<Vec<Value>> {
        let doc = self.document()?;
        doc.orders
            .iter()
            .map(|o| order_value(&doc, o, expand))
            .collect()
    }

    pub fn get_order(&self, id: &str, expand: &Expansions) -> Result<Value> {
        let doc = self.document()?;
        let order = doc
            .orders
            .iter()
            .find(|o| o.id == id)
            .ok_or_else(|| not_found("order", id))?;
        order_value(&doc, order, expand)
    }

    pub fn update_order(&self, id: &str, patch: OrderPatch) -> Result<Order> {
        self.mutate(move |doc| {
            let order = doc
                .orders
                .iter_mut()
                .find(|o| o.id == id)
                .ok_or_else(|| not_found("order", id))?;
            if let Some(status) = patch.status {
                order.status = status;
                order.updated_at = Some(Utc::now());
            }
            Ok(order.clone())
        })
    }

    pub fn delete_order(&self, id: &str) -> Result<()> {
        self.mutate(|doc| {
            let idx = doc
                .orders
                .iter()
                .position(|o| o.id == id)
                .ok_or_else(|| not_found("order", id))?;
            doc.orders.remove(idx);
            Ok(())
        })
    }

    // -- coupons ------------------------------------------------------------

    pub fn create_coupon(&self, payload: NewCoupon) -> Result<Coupon> {
        let NewCoupon {
            code,
            discount_percentage,
        } = payload;
        let code = required_text("code", code)?.trim().to_uppercase();
        let discount_percentage = match discount_percentage {
            Some(d) => validate_discount(d)?,
            None => return Err(required("discount_percentage")),
        };

        let coupon = self.mutate(move |doc| {
            ensure_unique_code(&doc.coupons, &code, None)?;
            let coupon = Coupon {
                id: fresh_id(&doc.coupons, |c| c.id.as_str()),
                code,
                discount_percentage,
                created_at: Utc::now(),
                updated_at: None,
            };
            doc.coupons.push(coupon.clone());
            Ok(coupon)
        })?;
        debug!(id = %coupon.id, code = %coupon.code, "created coupon");
        Ok(coupon)
    }

    pub fn list_coupons(&self) -> Result<Vec<Coupon>> {
        Ok(self.document()?.coupons)
    }

    pub fn get_coupon(&self, id: &str) -> Result<Coupon> {
        self.document()?
            .coupons
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| not_found("coupon", id))
    }

    pub fn update_coupon(&self, id: &str, patch: CouponPatch) -> Result<Coupon> {
        let CouponPatch {
            code,
            discount_percentage,
        } = patch;
        let code = code
            .map(|c| {
                let normalized = c.trim().to_uppercase();
                non_empty("code", &normalized).map(|_| normalized)
            })
            .transpose()?;
        let discount_percentage = discount_percentage.map(validate_discount).transpose()?;

        self.mutate(move |doc| {
            let idx = doc
                .coupons
                .iter()
                .position(|c| c.id == id)
                .ok_or_else(|| not_found("coupon", id))?;
            if let Some(code) = &code {
                ensure_unique_code(&doc.coupons, code, Some(id))?;
            }
            let coupon = &mut doc.coupons[idx];
            let mut changed = false;
            if let Some(code) = code {
                coupon.code = code;
                changed = true;
            }
            if let Some(discount_percentage) = discount_percentage {
                coupon.discount_percentage = discount_percentage;
                changed = true;
            }
            if changed {
                coupon.updated_at = Some(Utc::now());
            }
            Ok(coupon.clone())
        })
    }

    pub fn delete_coupon(&self, id: &str) -> Result<()> {
        self.mutate(|doc| {
            let idx = doc
                .coupons
                .iter()
                .position(|c| c.id == id)
                .ok_or_else(|| not_found("coupon", id))?;
            doc.coupons.remove(idx);
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Expansion resolution
//
// Expansion is additive and computed per request: the serialized record gets
// one extra field per requested relation, holding the referenced record or
// null when the reference is unset or no longer resolves.
// ---------------------------------------------------------------------------

fn book_value(doc: &CatalogDocument, book: &Book, expand: &Expansions) -> Result<Value> {
    let mut value = serde_json::to_value(book)?;
    if let Some(map) = value.as_object_mut() {
        if expand.wants("author") {
            let related = doc
                .author(&book.author_id)
                .map(serde_json::to_value)
                .transpose()?;
            map.insert("author".to_string(), related.unwrap_or(Value::Null));
        }
        if expand.wants("category") {
            let related = book
                .category_id
                .as_deref()
                .and_then(|id| doc.category(id))
                .map(serde_json::to_value)
                .transpose()?;
            map.insert("category".to_string(), related.unwrap_or(Value::Null));
        }
        if expand.wants("publisher") {
            let related = book
                .publisher_id
                .as_deref()
                .and_then(|id| doc.publisher(id))
                .map(serde_json::to_value)
                .transpose()?;
            map.insert("publisher".to_string(), related.unwrap_or(Value::Null));
        }
    }
    Ok(value)
}

fn review_value(doc: &CatalogDocument, review: &Review, expand: &Expansions) -> Result<Value> {
    let mut value = serde_json::to_value(review)?;
    if let Some(map) = value.as_object_mut() {
        if expand.wants("user") {
            // Embedded users are stripped the same as direct user reads
            let related = doc
                .user(&review.user_id)
                .map(public_user_value)
                .transpose()?;
            map.insert("user".to_string(), related.unwrap_or(Value::Null));
        }
        if expand.wants("book") {
            let related = doc
                .book(&review.book_id)
                .map(serde_json::to_value)
                .transpose()?;
            map.insert("book".to_string(), related.unwrap_or(Value::Null));
        }
    }
    Ok(value)
}

fn order_value(doc: &CatalogDocument, order: &Order, expand: &Expansions) -> Result<Value> {
    let mut value = serde_json::to_value(order)?;
    if let Some(map) = value.as_object_mut() {
        if expand.wants("user") {
            let related = doc
                .user(&order.user_id)
                .map(public_user_value)
                .transpose()?;
            map.insert("user".to_string(), related.unwrap_or(Value::Null));
        }
        if expand.wants("book") {
            let mut items = Vec::with_capacity(order.items.len());
            for item in &order.items {
                let mut item_value = serde_json::to_value(item)?;
                if let Some(item_map) = item_value.as_object_mut() {
                    let related = doc
                        .book(&item.book_id)
                        .map(serde_json::to_value)
                        .transpose()?;
                    item_map.insert("book".to_string(), related.unwrap_or(Value::Null));
                }
                items.push(item_value);
            }
            map.insert("items".to_string(), Value::Array(items));
        }
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn random_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

/// Generates an ID not already present in the target collection
fn fresh_id<T>(items: &[T], id_of: impl Fn(&T) -> &str) -> String {
    loop {
        let id = random_id();
        if !items.iter().any(|item| id_of(item) == id) {
            return id;
        }
    }
}

fn required(field: &'static str) -> CatalogError {
    CatalogError::InvalidField {
        field,
        reason: "is required".to_string(),
    }
}

fn not_found(entity: &'static str, id: &str) -> CatalogError {
    CatalogError::NotFound {
        entity,
        id: id.to_string(),
    }
}

fn dangling(field: &'static str, id: &str) -> CatalogError {
    CatalogError::DanglingReference {
        field,
        id: id.to_string(),
    }
}

fn non_empty(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CatalogError::InvalidField {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

fn required_text(field: &'static str, value: Option<String>) -> Result<String> {
    match value {
        Some(text) => {
            non_empty(field, &text)?;
            Ok(text)
        }
        None => Err(required(field)),
    }
}

fn validate_price(price: f64) -> Result<f64> {
    if price.is_finite() && price >= 0.0 {
        Ok(price)
    } else {
        Err(CatalogError::InvalidField {
            field: "price",
            reason: "must be a non-negative number".to_string(),
        })
    }
}

fn validate_rating(rating: i64) -> Result<u8> {
    if (1..=5).contains(&rating) {
        Ok(rating as u8)
    } else {
        Err(CatalogError::InvalidField {
            field: "rating",
            reason: "must be between 1 and 5".to_string(),
        })
    }
}

fn validate_discount(value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 && value <= 100.0 {
        Ok(value)
    } else {
        Err(CatalogError::InvalidField {
            field: "discount_percentage",
            reason: "must be greater than 0 and at most 100".to_string(),
        })
    }
}

fn ensure_unique_email(users: &[User], email: &str, exclude: Option<&str>) -> Result<()> {
    let taken = users
        .iter()
        .any(|u| Some(u.id.as_str()) != exclude && u.email == email);
    if taken {
        return Err(CatalogError::DuplicateUnique {
            field: "email",
            value: email.to_string(),
        });
    }
    Ok(())
}

/// `code` must already be trimmed and upper-cased; stored codes always are,
/// so a plain equality check is the case-insensitive comparison.
fn ensure_unique_code(coupons: &[Coupon], code: &str, exclude: Option<&str>) -> Result<()> {
    let taken = coupons
        .iter()
        .any(|c| Some(c.id.as_str()) != exclude && c.code == code);
    if taken {
        return Err(CatalogError::DuplicateUnique {
            field: "code",
            value: code.to_string(),
        });
    }
    Ok(())
}
