//! Regulatory News - a digest of supervisory authority feeds
//!
//! This crate fetches RSS and Atom feeds from financial supervisors,
//! normalizes and deduplicates their items, and renders them as a single
//! Markdown page for a documentation site.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod parser;
pub mod render;
pub mod sanitize;
pub mod writer;

use chrono::Utc;
use tracing::{error, info};

pub use crate::config::{Config, FeedSource};
pub use crate::error::{Error, Result};

use crate::aggregate::aggregate;
use crate::fetcher::Fetcher;
use crate::render::render;
use crate::writer::write_output;

/// Runs one fetch, aggregate, render and write cycle and returns the number
/// of items published.
///
/// Feed failures only shrink the page; failing to write it is an error.
pub async fn run(config: &Config) -> Result<usize> {
    let fetcher = Fetcher::new(config)?;
    let batches = fetcher.fetch_all(&config.feeds).await;

    let items = aggregate(batches, config.max_items);
    let page = render(&items, &config.directory(), Utc::now());

    if let Err(e) = write_output(&config.output_path, &page).await {
        error!(path = %config.output_path.display(), error = %e, "Failed to write digest");
        return Err(e);
    }

    info!(
        path = %config.output_path.display(),
        count = items.len(),
        "Generated digest"
    );
    Ok(items.len())
}
