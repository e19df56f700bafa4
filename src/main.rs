//! Application entry point and server initialization
//!
//! This module contains the main function that:
//! - Loads environment configuration
//! - Initializes the database and the two stores
//! - Spawns the background match-scan worker
//! - Starts the HTTP server with graceful shutdown support

use std::env;
use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

// Module declarations
mod database;
mod error;
mod handler;
mod middleware;
mod model;
mod route;
mod scanner;
mod similarity;
mod store;

use database::{init_db, AppState};
use route::create_app;
use scanner::MatchScanner;
use store::{ItemStore, MatchStore};

/// Application entry point
///
/// This asynchronous main function:
/// 1. Loads environment variables from a .env file if present
/// 2. Reads configuration (PORT and DATABASE_URL)
/// 3. Initializes the embedded database and the stores
/// 4. Starts the match-scan worker and wires the application state
/// 5. Starts the HTTP server with graceful shutdown handling
///
/// # Environment Variables
///
/// - `PORT` - Server port number (default: 8080)
/// - `DATABASE_URL` - Path to the database file (default: "lostfound.db")
/// - `AUTHORIZATION` - Optional shared secret required on every API call
#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter("lostfound=debug,tower_http=debug")
        .init();

    let port_str = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let port: u16 = port_str.parse().unwrap_or(8080);

    let db_name = env::var("DATABASE_URL").unwrap_or_else(|_| "lostfound.db".to_string());

    let db = Arc::new(init_db(&db_name).expect("Failed to initialize database"));

    let items = ItemStore::new(db.clone());
    let matches = MatchStore::new(db);

    // The worker owns the scan loop; handlers only enqueue item ids.
    let (scan_queue, _worker) =
        scanner::start(MatchScanner::new(items.clone(), matches.clone()));

    let state = AppState {
        items,
        matches,
        scanner: scan_queue,
    };

    let app = create_app(state).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await.unwrap();

    println!("🚀 Server running at http://localhost:{}", port);
    println!("📂 Using database: {}", db_name);

    // The server keeps running until it receives SIGTERM or SIGINT
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

/// Handles graceful shutdown signals
///
/// Returns when SIGINT (Ctrl+C) or, on Unix, SIGTERM is received. Open
/// connections are allowed to complete and database transactions close
/// cleanly before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    println!("\n🛑 Shutdown signal received, stopping server.");
}
