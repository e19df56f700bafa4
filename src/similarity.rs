//! Confidence scoring between a lost and a found report
//!
//! The score is a deterministic lexical overlap, not a learned model. Three
//! signals contribute, and their sum (clamped to 1.0) is the confidence:
//!
//! 1. Category equality, case-insensitive: `CATEGORY_WEIGHT`
//! 2. Title token overlap: up to `TITLE_WEIGHT`, scaled by the share of
//!    distinct tokens the two titles have in common
//! 3. Description token overlap, computed the same way: up to
//!    `DESCRIPTION_WEIGHT`
//!
//! Tokens are lowercased whitespace-split words; words of three characters or
//! fewer are discarded so stop-words ("a", "the", "my") cannot inflate the
//! overlap. The scanner creates a match when the score reaches
//! `MATCH_THRESHOLD`.
//!
//! These constants are the scoring contract. They are intentionally not
//! configurable.

use std::collections::HashSet;

use crate::model::Item;

/// Contribution of an exact (case-insensitive) category match
pub const CATEGORY_WEIGHT: f64 = 0.35;

/// Maximum contribution of title token overlap
pub const TITLE_WEIGHT: f64 = 0.30;

/// Maximum contribution of description token overlap
pub const DESCRIPTION_WEIGHT: f64 = 0.30;

/// Minimum score at which the scanner records a match
pub const MATCH_THRESHOLD: f64 = 0.45;

/// Tokens shorter than this are ignored
const MIN_TOKEN_LEN: usize = 4;

fn token_set(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|word| word.to_lowercase())
        .filter(|word| word.chars().count() >= MIN_TOKEN_LEN)
        .collect()
}

/// Share of distinct tokens common to both texts, relative to the larger
/// token set. 0.0 when either side has no usable tokens.
fn overlap(a: &str, b: &str) -> f64 {
    let tokens_a = token_set(a);
    let tokens_b = token_set(b);

    let larger = tokens_a.len().max(tokens_b.len());
    if larger == 0 {
        return 0.0;
    }

    let common = tokens_a.intersection(&tokens_b).count();
    common as f64 / larger as f64
}

/// Scores how likely a lost report and a found report describe the same
/// physical object. Returns a value in [0, 1].
///
/// The score depends only on record content, never on argument order; the
/// caller identifies which report is the lost one and which the found one
/// from each item's own status. Same-status pairs are never scored (the
/// scanner only draws candidates from the opposite pool).
pub fn score(lost: &Item, found: &Item) -> f64 {
    let mut score = 0.0;

    if lost.category.to_lowercase() == found.category.to_lowercase() {
        score += CATEGORY_WEIGHT;
    }

    score += TITLE_WEIGHT * overlap(&lost.title, &found.title);
    score += DESCRIPTION_WEIGHT * overlap(&lost.description, &found.description);

    score.min(1.0)
}
