//! Pure browse queries over the record collection.
//!
//! Ordering and filtering are presentation concerns, not store guarantees,
//! so they live here as functions over a slice rather than as SQL.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::domain::VideoRecord;

/// Watched fraction at which a video stops counting as "in progress"
const IN_PROGRESS_CEILING: f64 = 0.95;

/// Sort order for the collection view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    /// Most recently added first
    #[default]
    DateAdded,
    /// Case-insensitive name, ascending
    Name,
    /// Largest first
    Size,
    /// Most recently watched first; never-watched sort last
    LastWatched,
}

/// Category filter for the collection view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Filter {
    #[default]
    All,
    Favorites,
    Unwatched,
    /// Started but not effectively finished (0 < progress < 0.95)
    InProgress,
}

/// Apply search, filter and sort in one pass, returning a fresh Vec
pub fn apply(records: &[VideoRecord], search: &str, filter: Filter, sort: SortKey) -> Vec<VideoRecord> {
    let needle = search.trim().to_lowercase();

    let mut result: Vec<VideoRecord> = records
        .iter()
        .filter(|record| needle.is_empty() || record.name.to_lowercase().contains(&needle))
        .filter(|record| matches_filter(record, filter))
        .cloned()
        .collect();

    sort_records(&mut result, sort);
    result
}

fn matches_filter(record: &VideoRecord, filter: Filter) -> bool {
    match filter {
        Filter::All => true,
        Filter::Favorites => record.favorite,
        Filter::Unwatched => record.last_watched_at.is_none(),
        Filter::InProgress => record
            .watch_progress
            .map(|p| p > 0.0 && p < IN_PROGRESS_CEILING)
            .unwrap_or(false),
    }
}

fn sort_records(records: &mut [VideoRecord], sort: SortKey) {
    match sort {
        SortKey::Name => {
            records.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        }
        SortKey::Size => records.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes)),
        SortKey::LastWatched => records.sort_by(|a, b| {
            match (a.last_watched_at, b.last_watched_at) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(x), Some(y)) => y.cmp(&x),
            }
        }),
        SortKey::DateAdded => records.sort_by(|a, b| b.added_at.cmp(&a.added_at)),
    }
}
