use std::time::Duration;

use async_trait::async_trait;
use cn_core::{Article, FeedSource, Result};
use reqwest::Client;

pub mod html;
pub mod rss;

pub use html::HtmlExtractor;
pub use rss::RssScraper;

/// Browser-like identity sent with feed and page requests
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[async_trait]
pub trait Scraper: Send + Sync {
    /// Candidate articles for one feed, with page content already extracted.
    /// Failures are logged and yield an empty list.
    async fn fetch_articles(&self, source: &FeedSource) -> Vec<Article>;
}

#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Main text of the page at `url`, or an empty string on any failure
    async fn extract(&self, url: &str) -> String;
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?)
}
