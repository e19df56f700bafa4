//! HTTP request handlers for the lost-and-found API
//!
//! This module implements the boundary surface of the matching core:
//! - Submitting lost/found reports (which triggers a match scan)
//! - Browsing reports with owner/status filters and pagination
//! - Updating and deleting reports (deletion cascades to matches)
//! - Listing proposed matches and approving or denying them

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::database::AppState;
use crate::error::CoreError;
use crate::model::{
    CreateItemRequest, ItemListParams, MatchListParams, UpdateItemRequest,
    UpdateMatchStatusRequest,
};
use crate::store::{ItemFilter, MatchFilter};

/// Submits a new lost or found report
///
/// This handler:
/// 1. Validates the required fields (title, description, category,
///    location name, contact email)
/// 2. Persists the report with a fresh id and timestamps
/// 3. Queues a match scan against the opposite pool
/// 4. Returns the stored record
///
/// The scan runs in the background; its outcome never affects this response.
/// A report is created even if scanning is unavailable.
///
/// # Response
///
/// - **201 Created** - Report stored; body is the full record
/// - **400 Bad Request** - A required field is missing or empty
pub async fn create_item(
    State(state): State<AppState>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let item = state.items.create(payload)?;
    state.scanner.enqueue(&item.id);

    Ok((StatusCode::CREATED, Json(item)))
}

/// Retrieves a single report by id
///
/// # Response
///
/// - **200 OK** - The report
/// - **404 Not Found** - No report with this id
pub async fn get_item(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, CoreError> {
    Ok(Json(state.items.get(&id)?))
}

/// Lists reports with filtering and pagination
///
/// # Query Parameters
///
/// - `ownerId` (optional) - Only this user's reports
/// - `status` (optional) - Only `lost` or only `found` reports
/// - `page` (optional) - Page number, starts from 1 (default: 1)
/// - `limit` (optional) - Items per page, max 100 (default: 20)
///
/// # Example Request
///
/// `GET /api/items?ownerId=user_42&status=lost&page=1&limit=20`
///
/// # Response
///
/// ```json
/// {
///   "page": 1,
///   "limit": 20,
///   "total_fetched": 3,
///   "data": [...]
/// }
/// ```
pub async fn list_items(
    State(state): State<AppState>,
    Query(params): Query<ItemListParams>,
) -> Result<impl IntoResponse, CoreError> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(20).min(100);
    let offset = (page - 1) * limit;

    let items = state.items.list(&ItemFilter {
        owner_id: params.owner_id,
        status: params.status,
    })?;

    let data: Vec<_> = items.into_iter().skip(offset).take(limit).collect();

    Ok(Json(json!({
        "page": page,
        "limit": limit,
        "total_fetched": data.len(),
        "data": data,
    })))
}

/// Applies a partial update to a report
///
/// Only the descriptive fields can change; `status` and `ownerId` are fixed
/// at creation. `updatedAt` is refreshed. Existing match confidences are not
/// recomputed here; they track the next scan that touches the pair.
///
/// # Response
///
/// - **200 OK** - The updated record
/// - **400 Bad Request** - An updated field would become empty
/// - **404 Not Found** - No report with this id
pub async fn update_item(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<impl IntoResponse, CoreError> {
    Ok(Json(state.items.update(&id, payload)?))
}

/// Deletes a report and every match referencing it
///
/// # Response
///
/// - **200 OK** - Report deleted; body carries the count of matches removed
///   with it
/// - **404 Not Found** - No report with this id
pub async fn delete_item(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, CoreError> {
    let removed_matches = state.items.delete(&id)?;

    Ok(Json(json!({
        "message": "Item deleted successfully",
        "deleted_id": id,
        "removed_matches": removed_matches,
    })))
}

/// Lists proposed matches, each with its referenced items resolved
///
/// # Query Parameters
///
/// - `items` (optional) - Comma-separated item ids; keeps matches touching
///   any of them
/// - `ownerId` (optional) - Keeps matches where either referenced item
///   belongs to this user
///
/// # Example Request
///
/// `GET /api/matches?ownerId=user_42`
pub async fn list_matches(
    State(state): State<AppState>,
    Query(params): Query<MatchListParams>,
) -> Result<impl IntoResponse, CoreError> {
    let involving = params.items.map(|raw| {
        raw.split(',')
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect::<Vec<_>>()
    });

    let data = state.matches.list(&MatchFilter {
        involving,
        owner_id: params.owner_id,
    })?;

    Ok(Json(json!({
        "total_fetched": data.len(),
        "data": data,
    })))
}

/// Retrieves a single match record by id
///
/// # Response
///
/// - **200 OK** - The match record (unresolved; use the listing endpoint for
///   embedded items)
/// - **404 Not Found** - No match with this id
pub async fn get_match(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, CoreError> {
    Ok(Json(state.matches.get(&id)?))
}

/// Approves or denies a pending match
///
/// The first decision is final: deciding an already-decided match returns
/// the record unchanged.
///
/// # Request Body
///
/// ```json
/// { "status": "approved" }
/// ```
///
/// # Response
///
/// - **200 OK** - The record after the transition (or as it already stood)
/// - **400 Bad Request** - Requested status was `pending`
/// - **404 Not Found** - No match with this id
pub async fn update_match_status(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateMatchStatusRequest>,
) -> Result<impl IntoResponse, CoreError> {
    Ok(Json(state.matches.update_status(&id, payload.status)?))
}
