use std::time::Duration;

use async_trait::async_trait;

use crate::types::{Article, ArticleAnalysis, DatabaseStats, StoredArticle};
use crate::Result;

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Insert an analyzed article, replacing any existing row with the same URL
    async fn upsert_article(&self, article: &Article, analysis: &ArticleAnalysis) -> Result<()>;

    /// Newest articles where every term appears in the title, content or raw analysis.
    /// An empty term list returns the newest articles unfiltered.
    async fn search_articles(&self, terms: &[String], limit: usize) -> Result<Vec<StoredArticle>>;

    /// Newest articles by publish date
    async fn recent_articles(&self, limit: usize) -> Result<Vec<StoredArticle>>;

    /// Look up an article by its URL
    async fn get_by_url(&self, url: &str) -> Result<Option<StoredArticle>>;

    /// Total, fetched-today and per-source article counts
    async fn stats(&self) -> Result<DatabaseStats>;

    /// A cached response for this exact query, if one is younger than `max_age`
    async fn cached_response(&self, query: &str, max_age: Duration) -> Result<Option<String>>;

    /// Remember the response generated for this exact query
    async fn cache_response(&self, query: &str, response: &str) -> Result<()>;
}
