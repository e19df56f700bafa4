//! Route definitions for the lost-and-found API
//!
//! This module configures all HTTP routes and maps them to their respective
//! handlers. It creates the Axum router with the application state.

use axum::routing::get;
use axum::Router;

use crate::database::AppState;
use crate::handler::{
    create_item, delete_item, get_item, get_match, list_items, list_matches,
    update_item, update_match_status,
};

use crate::middleware::auth_middleware;
use axum::middleware;

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// - `GET    /api/items` - Lists reports (owner/status filters, pagination)
/// - `POST   /api/items` - Submits a report and queues a match scan
/// - `GET    /api/items/{id}` - Fetches one report
/// - `PUT    /api/items/{id}` - Updates a report's descriptive fields
/// - `DELETE /api/items/{id}` - Deletes a report and its matches
/// - `GET    /api/matches` - Lists matches with resolved items
/// - `GET    /api/matches/{id}` - Fetches one match record
/// - `PATCH  /api/matches/{id}` - Approves or denies a match
///
/// Every route sits behind the optional shared-secret authorization check.
///
/// # Example Usage
///
/// ```no_run
/// # use std::sync::Arc;
/// # use lostfound::database::{init_db, AppState};
/// # use lostfound::route::create_app;
/// # use lostfound::scanner::{self, MatchScanner};
/// # use lostfound::store::{ItemStore, MatchStore};
/// # let db = Arc::new(init_db("lostfound.db").unwrap());
/// let items = ItemStore::new(db.clone());
/// let matches = MatchStore::new(db);
/// let (queue, _worker) = scanner::start(MatchScanner::new(items.clone(), matches.clone()));
/// let state = AppState { items, matches, scanner: queue };
/// let app = create_app(state);
/// // axum::serve(listener, app).await.unwrap();
/// ```
pub fn create_app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/items", get(list_items).post(create_item))
        .route(
            "/items/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/matches", get(list_matches))
        .route("/matches/{id}", get(get_match).patch(update_match_status))
        .layer(middleware::from_fn(auth_middleware));

    Router::new()
        // Mount the API under /api
        .nest("/api", api_routes)
        // Inject the application state into all handlers
        .with_state(state)
}
