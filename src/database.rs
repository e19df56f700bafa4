//! Database initialization and table definitions
//!
//! This module handles the setup and configuration of the embedded redb
//! database. It defines the database tables and provides initialization
//! functions.

use redb::{Database, TableDefinition};

use crate::scanner::ScanQueue;
use crate::store::{ItemStore, MatchStore};

/// Main table for item records
///
/// Key: item ID as string
/// Value: JSON-serialized Item as string
///
/// Example:
/// - Key: "k3J9xQm2LpZa"
/// - Value: '{"id":"k3J9xQm2LpZa","ownerId":"user_42","status":"lost",...}'
pub const TABLE_ITEMS: TableDefinition<&str, &str> = TableDefinition::new("items_v1");

/// Index table for efficient querying of items by owner
///
/// Key: Composite key in format "{owner_id}:{timestamp_micros}:{item_id}"
/// Value: JSON-serialized Item as string
///
/// The timestamp keeps a user's reports in submission order; the trailing
/// item id keeps keys unique even for same-microsecond submissions.
pub const TABLE_OWNER_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("owner_index_v1");

/// Main table for match records
///
/// Key: match ID as string
/// Value: JSON-serialized Match as string
pub const TABLE_MATCHES: TableDefinition<&str, &str> = TableDefinition::new("matches_v1");

/// Uniqueness index for match pairs
///
/// Key: "{lost_item_id}/{found_item_id}"
/// Value: match ID
///
/// At most one match may exist per pair. Every upsert resolves through this
/// table inside a single write transaction, which is what makes concurrent
/// scans converge on one record instead of inserting duplicates.
pub const TABLE_MATCH_PAIRS: TableDefinition<&str, &str> =
    TableDefinition::new("match_pairs_v1");

/// Application state shared across all request handlers
///
/// The stores each hold a thread-safe handle to the same embedded database;
/// the scan queue feeds the background match worker.
#[derive(Clone)]
pub struct AppState {
    pub items: ItemStore,
    pub matches: MatchStore,
    pub scanner: ScanQueue,
}

/// Initializes the embedded database and creates required tables
///
/// Creates or opens the database file at the specified path, opens all four
/// tables so they exist from the first request on, and commits.
///
/// # Example
///
/// ```no_run
/// # use lostfound::database::init_db;
/// let db = init_db("lostfound.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_ITEMS)?;
        write_txn.open_table(TABLE_OWNER_INDEX)?;
        write_txn.open_table(TABLE_MATCHES)?;
        write_txn.open_table(TABLE_MATCH_PAIRS)?;
    }
    write_txn.commit()?;

    Ok(db)
}
