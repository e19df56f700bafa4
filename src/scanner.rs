//! Match scanning: candidate generation for newly submitted reports
//!
//! When a report is created, the submission handler enqueues its id here and
//! returns immediately; a background worker owns the actual scan. The scan
//! compares the new report against every report in the opposite pool and
//! upserts a match for each pair scoring at or above the threshold.
//!
//! Scans are idempotent (the store upserts on the pair key), so the worker
//! retries a failed scan a few times before giving up. A scan failure is
//! logged and swallowed; it never affects the outcome of the create request
//! that triggered it.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::error::CoreError;
use crate::model::{Item, ItemStatus};
use crate::similarity;
use crate::store::{ItemFilter, ItemStore, MatchStore};

/// Attempts per queued scan before it is dropped
const MAX_SCAN_ATTEMPTS: u32 = 3;

/// Delay between retries of a failed scan
const RETRY_DELAY: Duration = Duration::from_millis(200);

/// Compares new reports against the opposite pool and records matches
///
/// The stores are injected at construction; the scanner holds no state of its
/// own beyond them.
pub struct MatchScanner {
    items: ItemStore,
    matches: MatchStore,
}

impl MatchScanner {
    pub fn new(items: ItemStore, matches: MatchStore) -> Self {
        Self { items, matches }
    }

    /// Scans the opposite-status pool for candidates matching `new_item`
    ///
    /// Each candidate pair is oriented by the items' own statuses before
    /// scoring, and every pair scoring at least
    /// [`similarity::MATCH_THRESHOLD`] is upserted. Returns the number of
    /// matches recorded.
    pub fn scan(&self, new_item: &Item) -> Result<usize, CoreError> {
        let candidates = self.items.list(&ItemFilter {
            owner_id: None,
            status: Some(new_item.status.opposite()),
        })?;

        let mut recorded = 0;
        for candidate in &candidates {
            if candidate.id == new_item.id {
                continue;
            }

            let (lost, found) = match new_item.status {
                ItemStatus::Lost => (new_item, candidate),
                ItemStatus::Found => (candidate, new_item),
            };

            let confidence = similarity::score(lost, found);
            if confidence >= similarity::MATCH_THRESHOLD {
                self.matches.upsert(&lost.id, &found.id, confidence)?;
                recorded += 1;
            }
        }

        Ok(recorded)
    }

    /// Runs a queued scan by item id
    ///
    /// The report may have been deleted between enqueue and processing; that
    /// is a normal outcome, not an error.
    fn scan_queued(&self, item_id: &str) -> Result<usize, CoreError> {
        match self.items.get(item_id) {
            Ok(item) => self.scan(&item),
            Err(CoreError::NotFound(_)) => Ok(0),
            Err(err) => Err(err),
        }
    }
}

/// Handle for enqueueing scans from request handlers
#[derive(Clone)]
pub struct ScanQueue {
    tx: mpsc::UnboundedSender<String>,
}

impl ScanQueue {
    /// Queues a scan for the given item
    ///
    /// Never fails the caller: if the worker is gone the scan is lost and an
    /// error is logged, but the submission that triggered it stands.
    pub fn enqueue(&self, item_id: &str) {
        if self.tx.send(item_id.to_string()).is_err() {
            tracing::error!(item_id, "scan worker is not running; scan dropped");
        }
    }
}

/// Spawns the scan worker and returns the queue feeding it
///
/// The worker drains the queue one scan at a time, retrying each failed scan
/// up to [`MAX_SCAN_ATTEMPTS`] times. It exits when every `ScanQueue` clone
/// has been dropped.
pub fn start(scanner: MatchScanner) -> (ScanQueue, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let handle = tokio::spawn(async move {
        while let Some(item_id) = rx.recv().await {
            let mut attempt = 1;
            loop {
                match scanner.scan_queued(&item_id) {
                    Ok(recorded) => {
                        if recorded > 0 {
                            tracing::info!(item_id = %item_id, matches = recorded, "scan recorded matches");
                        }
                        break;
                    }
                    Err(err) if attempt < MAX_SCAN_ATTEMPTS => {
                        tracing::warn!(
                            item_id = %item_id,
                            attempt,
                            error = %err,
                            "scan failed, retrying"
                        );
                        attempt += 1;
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                    Err(err) => {
                        tracing::error!(item_id = %item_id, error = %err, "scan failed, giving up");
                        break;
                    }
                }
            }
        }
    });

    (ScanQueue { tx }, handle)
}
