use reqwest::header::LOCATION;
use reqwest::{redirect, Client, Url};
use tracing::{debug, error, info};

use crate::aggregate::FeedBatch;
use crate::config::{Config, FeedSource};
use crate::error::{Error, Result};
use crate::parser::{self, FeedEntry};

pub struct Fetcher {
    client: Client,
    max_redirects: usize,
}

impl Fetcher {
    pub fn new(config: &Config) -> Result<Self> {
        // Redirects are followed by hand so the hop limit is ours to enforce.
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .redirect(redirect::Policy::none())
            .build()
            .map_err(Error::Network)?;

        Ok(Self {
            client,
            max_redirects: config.max_redirects,
        })
    }

    /// GETs `url` and returns the body as text.
    ///
    /// A 3xx response with a `Location` header is followed, relative targets
    /// resolved against the current URL, for at most `max_redirects` hops.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let mut current = Url::parse(url)
            .map_err(|e| Error::Config(format!("invalid feed URL {url}: {e}")))?;

        for hop in 0..=self.max_redirects {
            let response = self.client.get(current.clone()).send().await?;
            let status = response.status();

            if status.is_redirection() {
                if let Some(location) = response.headers().get(LOCATION) {
                    let location = location
                        .to_str()
                        .map_err(|_| Error::InvalidRedirect("non-ASCII Location header".into()))?;
                    let next = current
                        .join(location)
                        .map_err(|e| Error::InvalidRedirect(format!("{location}: {e}")))?;

                    debug!(from = %current, to = %next, hop, "Following redirect");
                    current = next;
                    continue;
                }
            } else if !status.is_success() {
                return Err(Error::Status(status.as_u16()));
            }

            return Ok(response.text().await?);
        }

        Err(Error::TooManyRedirects(self.max_redirects))
    }

    pub async fn fetch_feed(&self, feed: &FeedSource) -> Result<Vec<FeedEntry>> {
        let body = self.fetch(&feed.url).await?;
        parser::parse(&body)
    }

    /// Fetches every feed in order, one at a time.
    ///
    /// A failing feed is logged and contributes no entries; it never stops
    /// the remaining feeds from being fetched.
    pub async fn fetch_all<'a>(&self, feeds: &'a [FeedSource]) -> Vec<FeedBatch<'a>> {
        let mut batches = Vec::with_capacity(feeds.len());

        for feed in feeds {
            info!(source = %feed.source, url = %feed.url, "Fetching feed");

            let entries = match self.fetch_feed(feed).await {
                Ok(entries) => {
                    info!(source = %feed.source, count = entries.len(), "Fetched feed items");
                    entries
                }
                Err(e) => {
                    error!(
                        source = %feed.source,
                        url = %feed.url,
                        error = %e,
                        "Failed to fetch feed"
                    );
                    Vec::new()
                }
            };

            batches.push(FeedBatch {
                source: feed,
                entries,
            });
        }

        batches
    }
}
