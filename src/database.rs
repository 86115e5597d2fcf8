//! Database initialization and table definitions
//!
//! The catalog is persisted as a single JSON document held under one key in
//! an embedded redb database. This module sets up that table, seeds the
//! empty document on first run, and defines the shared application state.

use redb::{Database, ReadableTable, TableDefinition};
use std::sync::Arc;

use crate::error::CatalogError;
use crate::model::CatalogDocument;
use crate::store::CatalogStore;

/// Table holding the catalog document
///
/// Key: always [`DOCUMENT_KEY`]
/// Value: the JSON-serialized [`CatalogDocument`]
pub const TABLE_CATALOG: TableDefinition<&str, &str> = TableDefinition::new("catalog_v1");

/// The single key the catalog document lives under
pub const DOCUMENT_KEY: &str = "catalog";

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe reference to the catalog store
    pub store: Arc<CatalogStore>,
}

/// Initializes the embedded database and seeds the catalog document
///
/// Creates or opens the database file at `db_path`, opens the catalog table,
/// and writes an empty document (all entity lists present) if none exists
/// yet. Existing documents are left untouched.
pub fn init_db(db_path: &str) -> Result<Database, CatalogError> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(TABLE_CATALOG)?;
        if table.get(DOCUMENT_KEY)?.is_none() {
            let empty = serde_json::to_string(&CatalogDocument::default())?;
            table.insert(DOCUMENT_KEY, empty.as_str())?;
        }
    }
    write_txn.commit()?;

    Ok(db)
}
