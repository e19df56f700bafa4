//! Data models for the lost-and-found service
//!
//! This module defines all the data structures used throughout the application:
//! the stored domain records (items and matches) and the request/response
//! models of the HTTP API.
//!
//! All records serialize with camelCase field names so the wire format matches
//! what the dashboard and submission clients expect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Whether an item was reported as lost or found
///
/// The status is fixed at creation time. It partitions the inventory into two
/// disjoint pools, and matching only ever happens across the pools, so letting
/// it change later would invalidate every match referencing the item.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Lost,
    Found,
}

impl ItemStatus {
    /// The pool a new report is matched against
    pub fn opposite(self) -> Self {
        match self {
            ItemStatus::Lost => ItemStatus::Found,
            ItemStatus::Found => ItemStatus::Lost,
        }
    }
}

/// Lifecycle state of a proposed match
///
/// A match starts out `Pending` and is decided exactly once, by either party,
/// into one of the two terminal states.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Pending,
    Approved,
    Denied,
}

impl MatchStatus {
    pub fn is_decided(self) -> bool {
        !matches!(self, MatchStatus::Pending)
    }
}

/// Where an item was lost or found
///
/// The name is free text ("Main Library, 2nd floor"); coordinates are only
/// present when the submission flow attached a map pin.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ItemLocation {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<GeoPoint>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// How the finder and owner coordinate a handover
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ItemContact {
    pub email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A single lost or found report stored in the database
///
/// # Example
/// ```json
/// {
///   "id": "k3J9xQm2LpZa",
///   "ownerId": "user_42",
///   "title": "Black Dell Laptop",
///   "description": "Lost near the library entrance",
///   "status": "lost",
///   "category": "Electronics",
///   "location": { "name": "Main Library" },
///   "contact": { "email": "me@campus.edu" },
///   "createdAt": "2026-08-06T13:40:00Z",
///   "updatedAt": "2026-08-06T13:40:00Z"
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Opaque record identifier, assigned at creation
    pub id: String,

    /// Identifier of the reporting user; immutable
    pub owner_id: String,

    pub title: String,
    pub description: String,

    /// Lost or found; immutable after creation
    pub status: ItemStatus,

    /// Free-form label ("Electronics", "Keys"); coarse matching signal
    pub category: String,

    pub location: ItemLocation,
    pub contact: ItemContact,

    /// Reference to an externally stored image; stored and returned as-is,
    /// never interpreted by the matching core
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Refreshed on any mutation of the record
    pub updated_at: DateTime<Utc>,
}

/// A proposed pairing between one lost and one found item
///
/// At most one match exists per `(lostItemId, foundItemId)` pair; the scanner
/// upserts on that key rather than inserting unconditionally.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,

    /// References an item with status `lost`
    pub lost_item_id: String,

    /// References an item with status `found`; always distinct from the lost one
    pub found_item_id: String,

    /// Scorer output in [0, 1] as of the most recent scan
    pub confidence: f64,

    pub status: MatchStatus,

    pub created_at: DateTime<Utc>,
}

/// A match as returned by the listing endpoint, with both referenced items
/// resolved so the dashboard can render cards without extra lookups
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MatchView {
    #[serde(flatten)]
    pub record: Match,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lost_item: Option<Item>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub found_item: Option<Item>,
}

/// Request payload for submitting a new report
///
/// # Example
/// ```json
/// {
///   "ownerId": "user_42",
///   "title": "Black Dell Laptop",
///   "description": "Lost near the library entrance",
///   "status": "lost",
///   "category": "Electronics",
///   "location": { "name": "Main Library" },
///   "contact": { "email": "me@campus.edu" }
/// }
/// ```
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub status: ItemStatus,
    pub category: String,
    pub location: ItemLocation,
    pub contact: ItemContact,

    #[serde(default)]
    pub image_url: Option<String>,
}

impl CreateItemRequest {
    /// Checks the required free-text fields before anything is persisted
    pub fn validate(&self) -> Result<(), CoreError> {
        let required = [
            ("ownerId", &self.owner_id),
            ("title", &self.title),
            ("description", &self.description),
            ("category", &self.category),
            ("location.name", &self.location.name),
            ("contact.email", &self.contact.email),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CoreError::Validation(format!(
                    "{} must not be empty",
                    field
                )));
            }
        }

        Ok(())
    }
}

/// Partial update of a report
///
/// Absent fields are left untouched. `status` and `ownerId` are deliberately
/// not part of this payload: they are immutable after creation.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<ItemLocation>,
    pub contact: Option<ItemContact>,
    pub image_url: Option<String>,
}

impl UpdateItemRequest {
    /// Rejects updates that would blank out a required field
    pub fn validate(&self) -> Result<(), CoreError> {
        let required = [
            ("title", &self.title),
            ("description", &self.description),
            ("category", &self.category),
        ];

        for (field, value) in required {
            if let Some(v) = value {
                if v.trim().is_empty() {
                    return Err(CoreError::Validation(format!(
                        "{} must not be empty",
                        field
                    )));
                }
            }
        }

        if let Some(location) = &self.location {
            if location.name.trim().is_empty() {
                return Err(CoreError::Validation(
                    "location.name must not be empty".to_string(),
                ));
            }
        }

        if let Some(contact) = &self.contact {
            if contact.email.trim().is_empty() {
                return Err(CoreError::Validation(
                    "contact.email must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Query parameters for listing items
///
/// Filters are conjunctive. Query string: `?ownerId=user_42&status=lost&page=1&limit=20`
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ItemListParams {
    pub owner_id: Option<String>,
    pub status: Option<ItemStatus>,

    /// Page number, starts from 1 (default: 1)
    pub page: Option<usize>,

    /// Items per page (default: 20, maximum: 100)
    pub limit: Option<usize>,
}

/// Query parameters for listing matches
///
/// `items` is a comma-separated set of item ids; a match qualifies when either
/// of its referenced items is in the set. `ownerId` keeps matches where either
/// referenced item belongs to that user. Both filters are conjunctive.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct MatchListParams {
    pub items: Option<String>,
    pub owner_id: Option<String>,
}

/// Request payload for deciding a match
///
/// The only accepted values are `"approved"` and `"denied"`.
#[derive(Deserialize, Debug)]
pub struct UpdateMatchStatusRequest {
    pub status: MatchStatus,
}
