//! Persistent stores for items and matches
//!
//! This module implements the two halves of the matching core's persistence:
//! - `ItemStore`: lost/found reports, with a secondary index for listing a
//!   user's own reports
//! - `MatchStore`: proposed pairings, keyed for uniqueness on the
//!   (lost, found) item pair
//!
//! Both stores wrap the same embedded database. Every mutation runs inside a
//! single redb write transaction, so the cross-table invariants (owner index
//! in step with the main table, one match per pair, no matches referencing a
//! deleted item) hold even under concurrent submissions: redb serializes
//! write transactions.

use std::sync::Arc;

use chrono::Utc;
use rand::{distr::Alphanumeric, Rng};
use redb::{Database, ReadableDatabase, ReadableTable, WriteTransaction};

use crate::database::{TABLE_ITEMS, TABLE_MATCHES, TABLE_MATCH_PAIRS, TABLE_OWNER_INDEX};
use crate::error::CoreError;
use crate::model::{
    CreateItemRequest, Item, ItemStatus, Match, MatchStatus, MatchView, UpdateItemRequest,
};

/// Generates an opaque 12-character alphanumeric record identifier
fn new_record_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect()
}

/// Composite key for the owner index: "{owner_id}:{micros}:{item_id}"
///
/// The timestamp keeps range scans in submission order; the item id keeps the
/// key unique for same-microsecond submissions by one user.
fn owner_index_key(item: &Item) -> String {
    format!(
        "{}:{}:{}",
        item.owner_id,
        item.created_at.timestamp_micros(),
        item.id
    )
}

/// Uniqueness key for a match pair: "{lost_item_id}/{found_item_id}"
///
/// The pair is already oriented (lost on the left), so one key covers the
/// unordered pair.
fn pair_key(lost_item_id: &str, found_item_id: &str) -> String {
    format!("{}/{}", lost_item_id, found_item_id)
}

/// Removes every match referencing the given item, from both the match table
/// and the pair index. Runs inside the caller's write transaction so item
/// deletion and match cleanup commit together.
fn purge_matches(write_txn: &WriteTransaction, item_id: &str) -> Result<u64, CoreError> {
    let mut table_matches = write_txn.open_table(TABLE_MATCHES)?;
    let mut table_pairs = write_txn.open_table(TABLE_MATCH_PAIRS)?;

    // Collect first; the table cannot be mutated while an iterator holds it.
    let doomed: Vec<Match> = table_matches
        .iter()?
        .filter_map(|res| {
            res.ok()
                .and_then(|(_, value)| serde_json::from_str::<Match>(value.value()).ok())
        })
        .filter(|m| m.lost_item_id == item_id || m.found_item_id == item_id)
        .collect();

    for doomed_match in &doomed {
        table_matches.remove(doomed_match.id.as_str())?;
        table_pairs.remove(pair_key(&doomed_match.lost_item_id, &doomed_match.found_item_id).as_str())?;
    }

    Ok(doomed.len() as u64)
}

/// Conjunctive filters for listing items
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub owner_id: Option<String>,
    pub status: Option<ItemStatus>,
}

/// Filters for listing matches
///
/// `involving` keeps matches where either referenced item id is in the set;
/// `owner_id` keeps matches where either resolved item belongs to that user.
#[derive(Debug, Clone, Default)]
pub struct MatchFilter {
    pub involving: Option<Vec<String>>,
    pub owner_id: Option<String>,
}

/// Store for lost/found reports
#[derive(Clone)]
pub struct ItemStore {
    db: Arc<Database>,
}

impl ItemStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Validates and persists a new report, assigning its id and timestamps
    ///
    /// Writes to two tables:
    /// 1. `TABLE_ITEMS` - main table indexed by item id
    /// 2. `TABLE_OWNER_INDEX` - secondary index for querying by owner
    pub fn create(&self, request: CreateItemRequest) -> Result<Item, CoreError> {
        request.validate()?;

        let now = Utc::now();
        let item = Item {
            id: new_record_id(),
            owner_id: request.owner_id,
            title: request.title,
            description: request.description,
            status: request.status,
            category: request.category,
            location: request.location,
            contact: request.contact,
            image_url: request.image_url,
            created_at: now,
            updated_at: now,
        };
        let item_json = serde_json::to_string(&item)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table_items = write_txn.open_table(TABLE_ITEMS)?;
            table_items.insert(item.id.as_str(), item_json.as_str())?;

            let mut table_index = write_txn.open_table(TABLE_OWNER_INDEX)?;
            table_index.insert(owner_index_key(&item).as_str(), item_json.as_str())?;
        }
        write_txn.commit()?;

        Ok(item)
    }

    pub fn get(&self, id: &str) -> Result<Item, CoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_ITEMS)?;

        match table.get(id)? {
            Some(guard) => Ok(serde_json::from_str(guard.value())?),
            None => Err(CoreError::NotFound("item")),
        }
    }

    /// Lists reports matching the filter, in insertion order
    ///
    /// An owner filter is served by a range scan over the owner index; the
    /// status filter is applied on top. Without an owner filter the main
    /// table is scanned, which is fine at the collection sizes this service
    /// holds.
    pub fn list(&self, filter: &ItemFilter) -> Result<Vec<Item>, CoreError> {
        let read_txn = self.db.begin_read()?;

        let mut items: Vec<Item> = match &filter.owner_id {
            Some(owner_id) => {
                let table = read_txn.open_table(TABLE_OWNER_INDEX)?;

                // "{owner_id}:" .. "{owner_id}:{" bounds the range to this
                // owner: '{' is the character after ':' in ASCII order.
                let start_key = format!("{}:", owner_id);
                let end_key = format!("{}:{{", owner_id);

                table
                    .range(start_key.as_str()..end_key.as_str())?
                    .filter_map(|res| {
                        res.ok().and_then(|(_, value)| {
                            serde_json::from_str::<Item>(value.value()).ok()
                        })
                    })
                    .collect()
            }
            None => {
                let table = read_txn.open_table(TABLE_ITEMS)?;

                table
                    .iter()?
                    .filter_map(|res| {
                        res.ok().and_then(|(_, value)| {
                            serde_json::from_str::<Item>(value.value()).ok()
                        })
                    })
                    .collect()
            }
        };

        if let Some(status) = filter.status {
            items.retain(|item| item.status == status);
        }

        Ok(items)
    }

    /// Applies a partial update and refreshes `updatedAt`
    ///
    /// `id`, `ownerId`, `status` and `createdAt` never change, so the owner
    /// index key stays stable and the entry is rewritten in place.
    pub fn update(&self, id: &str, changes: UpdateItemRequest) -> Result<Item, CoreError> {
        changes.validate()?;

        let write_txn = self.db.begin_write()?;
        let item = {
            let mut table_items = write_txn.open_table(TABLE_ITEMS)?;

            let mut item: Item = match table_items.get(id)? {
                Some(guard) => serde_json::from_str(guard.value())?,
                None => return Err(CoreError::NotFound("item")),
            };

            if let Some(title) = changes.title {
                item.title = title;
            }
            if let Some(description) = changes.description {
                item.description = description;
            }
            if let Some(category) = changes.category {
                item.category = category;
            }
            if let Some(location) = changes.location {
                item.location = location;
            }
            if let Some(contact) = changes.contact {
                item.contact = contact;
            }
            if let Some(image_url) = changes.image_url {
                item.image_url = Some(image_url);
            }
            item.updated_at = Utc::now();

            let item_json = serde_json::to_string(&item)?;
            table_items.insert(id, item_json.as_str())?;

            let mut table_index = write_txn.open_table(TABLE_OWNER_INDEX)?;
            table_index.insert(owner_index_key(&item).as_str(), item_json.as_str())?;

            item
        };
        write_txn.commit()?;

        Ok(item)
    }

    /// Deletes a report and every match referencing it
    ///
    /// The item removal, the owner index cleanup and the match purge commit
    /// in one transaction; a failure anywhere rolls the whole deletion back,
    /// so no match row can outlive its item.
    ///
    /// Returns the number of matches removed alongside the item.
    pub fn delete(&self, id: &str) -> Result<u64, CoreError> {
        let write_txn = self.db.begin_write()?;
        let removed_matches = {
            let mut table_items = write_txn.open_table(TABLE_ITEMS)?;

            let item: Item = match table_items.get(id)? {
                Some(guard) => serde_json::from_str(guard.value())?,
                None => return Err(CoreError::NotFound("item")),
            };
            table_items.remove(id)?;

            let mut table_index = write_txn.open_table(TABLE_OWNER_INDEX)?;
            table_index.remove(owner_index_key(&item).as_str())?;
            drop(table_index);

            purge_matches(&write_txn, id)?
        };
        write_txn.commit()?;

        Ok(removed_matches)
    }
}

/// Store for proposed lost/found pairings
#[derive(Clone)]
pub struct MatchStore {
    db: Arc<Database>,
}

impl MatchStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Creates or refreshes the match for a (lost, found) pair
    ///
    /// If a match already exists for the pair, only its `confidence` is
    /// rewritten; `status` is left untouched, whether pending or decided.
    /// Otherwise a new pending match is created.
    ///
    /// Both referenced items must exist and carry the expected roles. The
    /// lookup and the write share one transaction, so two scans racing on the
    /// same pair resolve to a single record.
    pub fn upsert(
        &self,
        lost_item_id: &str,
        found_item_id: &str,
        confidence: f64,
    ) -> Result<Match, CoreError> {
        if lost_item_id == found_item_id {
            return Err(CoreError::Validation(
                "a match must reference two distinct items".to_string(),
            ));
        }
        let confidence = confidence.clamp(0.0, 1.0);

        let write_txn = self.db.begin_write()?;
        let record = {
            let table_items = write_txn.open_table(TABLE_ITEMS)?;

            let lost: Item = match table_items.get(lost_item_id)? {
                Some(guard) => serde_json::from_str(guard.value())?,
                None => return Err(CoreError::NotFound("item")),
            };
            if lost.status != ItemStatus::Lost {
                return Err(CoreError::Validation(format!(
                    "item {} is not a lost item",
                    lost_item_id
                )));
            }

            let found: Item = match table_items.get(found_item_id)? {
                Some(guard) => serde_json::from_str(guard.value())?,
                None => return Err(CoreError::NotFound("item")),
            };
            if found.status != ItemStatus::Found {
                return Err(CoreError::Validation(format!(
                    "item {} is not a found item",
                    found_item_id
                )));
            }
            drop(table_items);

            let mut table_matches = write_txn.open_table(TABLE_MATCHES)?;
            let mut table_pairs = write_txn.open_table(TABLE_MATCH_PAIRS)?;
            let key = pair_key(lost_item_id, found_item_id);

            let existing: Option<Match> = {
                let existing_id = table_pairs
                    .get(key.as_str())?
                    .map(|guard| guard.value().to_string());

                match existing_id {
                    Some(match_id) => match table_matches.get(match_id.as_str())? {
                        Some(guard) => Some(serde_json::from_str(guard.value())?),
                        None => None,
                    },
                    None => None,
                }
            };

            let record = match existing {
                Some(mut record) => {
                    record.confidence = confidence;
                    record
                }
                None => Match {
                    id: new_record_id(),
                    lost_item_id: lost_item_id.to_string(),
                    found_item_id: found_item_id.to_string(),
                    confidence,
                    status: MatchStatus::Pending,
                    created_at: Utc::now(),
                },
            };

            let record_json = serde_json::to_string(&record)?;
            table_matches.insert(record.id.as_str(), record_json.as_str())?;
            table_pairs.insert(key.as_str(), record.id.as_str())?;

            record
        };
        write_txn.commit()?;

        Ok(record)
    }

    pub fn get(&self, id: &str) -> Result<Match, CoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_MATCHES)?;

        match table.get(id)? {
            Some(guard) => Ok(serde_json::from_str(guard.value())?),
            None => Err(CoreError::NotFound("match")),
        }
    }

    /// Lists matches with both referenced items resolved
    ///
    /// Resolution happens inside one read transaction, so every returned view
    /// is a consistent snapshot. A referenced item can only be absent for a
    /// record written by an older, pre-cascade version of the database.
    pub fn list(&self, filter: &MatchFilter) -> Result<Vec<MatchView>, CoreError> {
        let read_txn = self.db.begin_read()?;
        let table_matches = read_txn.open_table(TABLE_MATCHES)?;
        let table_items = read_txn.open_table(TABLE_ITEMS)?;

        let mut views = Vec::new();
        for entry in table_matches.iter()? {
            let (_, value) = entry?;
            let record: Match = serde_json::from_str(value.value())?;

            if let Some(involving) = &filter.involving {
                if !involving.contains(&record.lost_item_id)
                    && !involving.contains(&record.found_item_id)
                {
                    continue;
                }
            }

            let lost_item: Option<Item> = table_items
                .get(record.lost_item_id.as_str())?
                .and_then(|guard| serde_json::from_str(guard.value()).ok());
            let found_item: Option<Item> = table_items
                .get(record.found_item_id.as_str())?
                .and_then(|guard| serde_json::from_str(guard.value()).ok());

            if let Some(owner_id) = &filter.owner_id {
                let owned = |item: &Option<Item>| {
                    item.as_ref().is_some_and(|i| &i.owner_id == owner_id)
                };
                if !owned(&lost_item) && !owned(&found_item) {
                    continue;
                }
            }

            views.push(MatchView {
                record,
                lost_item,
                found_item,
            });
        }

        Ok(views)
    }

    /// Applies a status decision to a pending match
    ///
    /// The first terminal transition wins: deciding an already-decided match
    /// is a no-op that returns the record as it stands. Transitioning back to
    /// pending is not a thing.
    pub fn update_status(
        &self,
        id: &str,
        new_status: MatchStatus,
    ) -> Result<Match, CoreError> {
        if new_status == MatchStatus::Pending {
            return Err(CoreError::Validation(
                "a match can only be approved or denied".to_string(),
            ));
        }

        let write_txn = self.db.begin_write()?;
        let record = {
            let mut table_matches = write_txn.open_table(TABLE_MATCHES)?;

            let mut record: Match = match table_matches.get(id)? {
                Some(guard) => serde_json::from_str(guard.value())?,
                None => return Err(CoreError::NotFound("match")),
            };

            if !record.status.is_decided() {
                record.status = new_status;
                let record_json = serde_json::to_string(&record)?;
                table_matches.insert(id, record_json.as_str())?;
            }

            record
        };
        write_txn.commit()?;

        Ok(record)
    }

    /// Removes every match referencing the given item
    ///
    /// `ItemStore::delete` already purges matches in the same transaction as
    /// the item removal; this standalone entry point exists for maintenance
    /// use against items that are already gone.
    pub fn delete_by_item(&self, item_id: &str) -> Result<u64, CoreError> {
        let write_txn = self.db.begin_write()?;
        let removed = purge_matches(&write_txn, item_id)?;
        write_txn.commit()?;

        Ok(removed)
    }
}
