use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classify::Category;
use crate::error::Result;

/// Feed list compiled into the binary.
const BUILTIN_CONFIG: &str = include_str!("../feeds.toml");

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Where the rendered Markdown page is written
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    /// Maximum number of items kept after deduplication
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    pub feeds: Vec<FeedSource>,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("docs/regulatory-news.md")
}

fn default_max_items() -> usize {
    30
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_max_redirects() -> usize {
    5
}

fn default_user_agent() -> String {
    "RegulatoryNewsFeedBot/1.0".to_string()
}

/// One supervisory authority feed.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FeedSource {
    /// Short authority name, e.g. "AFM"
    pub source: String,
    /// Display label shown in headings, e.g. "🟢 AFM"
    pub label: String,
    pub url: String,
    /// The authority's own news page
    pub website: String,
    /// Link text for the website in the link table; derived from the URL when absent
    #[serde(default)]
    pub display: Option<String>,
    /// Fixed category applied to every item, bypassing the classifier
    #[serde(default, rename = "type")]
    pub category: Option<Category>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// The feed list shipped with the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_str(BUILTIN_CONFIG)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// One feed per distinct source, in configuration order.
    ///
    /// Several feeds may belong to one authority; the first one listed
    /// provides the label and website.
    pub fn directory(&self) -> Vec<&FeedSource> {
        let mut seen = HashSet::new();
        self.feeds
            .iter()
            .filter(|feed| seen.insert(feed.source.as_str()))
            .collect()
    }
}
