use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::classify::{classify, Category};
use crate::config::FeedSource;
use crate::parser::FeedEntry;

/// Length of the title prefix used to spot duplicates.
pub const DEDUP_KEY_CHARS: usize = 60;

/// Entries read from one feed, still attached to the feed they came from.
#[derive(Debug, Clone)]
pub struct FeedBatch<'a> {
    pub source: &'a FeedSource,
    pub entries: Vec<FeedEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub date: DateTime<Utc>,
    /// Date text as the feed gave it, if any
    pub raw_date: Option<String>,
    /// Name of the owning feed source, e.g. "AFM"
    pub source: String,
    pub label: String,
    pub category: Category,
}

impl NewsItem {
    /// Tags an entry with its feed. The feed's fixed category, if any, wins
    /// over the classifier.
    pub fn from_entry(entry: FeedEntry, source: &FeedSource) -> Self {
        let category = source
            .category
            .unwrap_or_else(|| classify(&entry.title, &entry.description));

        Self {
            title: entry.title,
            link: entry.link,
            description: entry.description,
            date: entry.date,
            raw_date: entry.raw_date,
            source: source.source.clone(),
            label: source.label.clone(),
            category,
        }
    }

    /// Lowercased first [`DEDUP_KEY_CHARS`] characters of the title.
    pub fn dedup_key(&self) -> String {
        self.title
            .to_lowercase()
            .chars()
            .take(DEDUP_KEY_CHARS)
            .collect()
    }
}

/// Merges feed batches into one list: newest first, duplicates removed,
/// at most `max_items` long.
///
/// The sort is stable, so items with equal dates keep configuration order.
/// Of several items sharing a dedup key, the first in sorted order survives.
pub fn aggregate(batches: Vec<FeedBatch<'_>>, max_items: usize) -> Vec<NewsItem> {
    let mut items: Vec<NewsItem> = batches
        .into_iter()
        .flat_map(|batch| {
            let source = batch.source;
            batch
                .entries
                .into_iter()
                .map(move |entry| NewsItem::from_entry(entry, source))
        })
        .collect();

    items.sort_by(|a, b| b.date.cmp(&a.date));

    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(item.dedup_key()));
    items.truncate(max_items);

    items
}
