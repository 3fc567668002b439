use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cn_core::{Article, Error, FeedSource, Result};
use reqwest::Client;
use tracing::{error, info};

use super::{http_client, ContentExtractor, Scraper};

/// Only the newest entries of each feed are considered per cycle
pub const MAX_ENTRIES_PER_FEED: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
}

pub struct RssScraper {
    client: Client,
    extractor: Arc<dyn ContentExtractor>,
    max_entries: usize,
}

impl RssScraper {
    pub fn new(extractor: Arc<dyn ContentExtractor>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            extractor,
            max_entries: MAX_ENTRIES_PER_FEED,
        })
    }

    async fn fetch_feed(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn fetch_entries(&self, source: &FeedSource) -> Result<Vec<FeedEntry>> {
        let body = self.fetch_feed(&source.url).await?;
        parse_feed(&body, self.max_entries)
    }
}

#[async_trait]
impl Scraper for RssScraper {
    async fn fetch_articles(&self, source: &FeedSource) -> Vec<Article> {
        let entries = match self.fetch_entries(source).await {
            Ok(entries) => entries,
            Err(e) => {
                error!("❌ Error fetching from {}: {}", source.name, e);
                return Vec::new();
            }
        };
        info!("📰 {} candidate articles from {}", entries.len(), source.name);

        let mut articles = Vec::with_capacity(entries.len());
        for entry in entries {
            let content = self.extractor.extract(&entry.link).await;
            articles.push(Article {
                title: entry.title,
                url: entry.link,
                content,
                source: source.name.clone(),
                published_at: entry.published_at,
            });
        }
        articles
    }
}

/// Parse an RSS or Atom document, keeping at most `limit` leading entries
/// that carry both a title and a link.
pub fn parse_feed(body: &[u8], limit: usize) -> Result<Vec<FeedEntry>> {
    let feed = feed_rs::parser::parse(body)
        .map_err(|e| Error::Feed(format!("Failed to parse feed: {}", e)))?;

    Ok(feed
        .entries
        .into_iter()
        .take(limit)
        .filter_map(|entry| {
            let title = entry
                .title
                .map(|title| title.content.trim().to_string())
                .filter(|title| !title.is_empty())?;
            let link = entry
                .links
                .first()
                .map(|link| link.href.trim().to_string())
                .filter(|link| !link.is_empty())?;
            Some(FeedEntry {
                title,
                link,
                published_at: entry.published.or(entry.updated),
            })
        })
        .collect())
}
