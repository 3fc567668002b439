use std::sync::Arc;
use std::time::Duration;

use cn_core::{Article, ArticleStorage, CycleReport, FeedSource, Logger};
use cn_inference::ArticleAnalyzer;
use tokio::time::sleep;

use crate::scrapers::Scraper;

pub const DEFAULT_ARTICLE_DELAY: Duration = Duration::from_secs(1);

/// Runs fetch, extract, analyze and store over every configured source.
pub struct PipelineManager {
    storage: Arc<dyn ArticleStorage>,
    analyzer: ArticleAnalyzer,
    scraper: Arc<dyn Scraper>,
    sources: Vec<FeedSource>,
    article_delay: Duration,
    logger: Logger,
}

impl PipelineManager {
    pub fn new(
        storage: Arc<dyn ArticleStorage>,
        analyzer: ArticleAnalyzer,
        scraper: Arc<dyn Scraper>,
        sources: Vec<FeedSource>,
        logger: Logger,
    ) -> Self {
        Self {
            storage,
            analyzer,
            scraper,
            sources,
            article_delay: DEFAULT_ARTICLE_DELAY,
            logger,
        }
    }

    /// Pause after every analysis request.
    pub fn with_article_delay(mut self, delay: Duration) -> Self {
        self.article_delay = delay;
        self
    }

    /// One full pass over the sources, in order. Per-item failures are counted, never raised.
    pub async fn run_cycle(&self) -> CycleReport {
        self.logger.info("🚀 Starting news fetch and analysis cycle");
        let mut report = CycleReport {
            sources: self.sources.len(),
            ..CycleReport::default()
        };

        for source in &self.sources {
            let logger = self.logger.with_prefix(format!("[{}]", source.name));
            logger.info(&format!("🔎 Fetching {}", source.url));

            let articles = self.scraper.fetch_articles(source).await;
            report.fetched += articles.len();

            for article in &articles {
                self.process_article(article, &logger, &mut report).await;
            }
        }

        self.logger.info(&format!(
            "✅ Cycle completed: {} stored, {} skipped, {} analysis failures, {} store failures",
            report.stored, report.skipped, report.failed_analyses, report.failed_stores
        ));
        report
    }

    async fn process_article(&self, article: &Article, logger: &Logger, report: &mut CycleReport) {
        if article.content.trim().is_empty() {
            logger.debug(&format!("⏭️ No content extracted for '{}', skipping", article.title));
            report.skipped += 1;
            return;
        }

        logger.info(&format!("🧠 Analyzing: {}", article.title));
        let analysis = self.analyzer.analyze(article).await;
        report.analyzed += 1;
        if analysis.is_failed() {
            logger.warn(&format!("⚠️ Analysis failed for '{}', storing the error", article.title));
            report.failed_analyses += 1;
        }

        match self.storage.upsert_article(article, &analysis).await {
            Ok(()) => report.stored += 1,
            Err(e) => {
                logger.error(&format!("❌ Failed to store '{}': {}", article.url, e));
                report.failed_stores += 1;
            }
        }

        if !self.article_delay.is_zero() {
            sleep(self.article_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cn_core::{ArticleAnalysis, DatabaseStats, Error, Result, StoredArticle};
    use cn_inference::models::DummyModel;
    use cn_storage::SQLiteStorage;
    use std::sync::Mutex;
    use tempfile::tempdir;

    const ANALYSIS_JSON: &str = r#"{"summary":"Short summary","sentiment":"Bullish","key_topics":["Bitcoin"],"market_implications":"Up"}"#;

    struct CannedScraper {
        articles: Vec<Article>,
        visited: Mutex<Vec<String>>,
    }

    impl CannedScraper {
        fn new(articles: Vec<Article>) -> Self {
            Self {
                articles,
                visited: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Scraper for CannedScraper {
        async fn fetch_articles(&self, source: &FeedSource) -> Vec<Article> {
            self.visited.lock().unwrap().push(source.name.clone());
            self.articles
                .iter()
                .filter(|a| a.source == source.name)
                .cloned()
                .collect()
        }
    }

    struct RejectingStorage;

    #[async_trait]
    impl ArticleStorage for RejectingStorage {
        async fn upsert_article(&self, _: &Article, _: &ArticleAnalysis) -> Result<()> {
            Err(Error::Database("disk I/O error".to_string()))
        }
        async fn search_articles(&self, _: &[String], _: usize) -> Result<Vec<StoredArticle>> {
            Ok(Vec::new())
        }
        async fn recent_articles(&self, _: usize) -> Result<Vec<StoredArticle>> {
            Ok(Vec::new())
        }
        async fn get_by_url(&self, _: &str) -> Result<Option<StoredArticle>> {
            Ok(None)
        }
        async fn stats(&self) -> Result<DatabaseStats> {
            Ok(DatabaseStats::default())
        }
        async fn cached_response(&self, _: &str, _: Duration) -> Result<Option<String>> {
            Ok(None)
        }
        async fn cache_response(&self, _: &str, _: &str) -> Result<()> {
            Ok(())
        }
    }

    fn article(source: &str, slug: &str, content: &str) -> Article {
        Article {
            title: format!("Story {}", slug),
            url: format!("https://{}.example/{}", source, slug),
            content: content.to_string(),
            source: source.to_string(),
            published_at: None,
        }
    }

    fn sources() -> Vec<FeedSource> {
        vec![
            FeedSource::new("decrypt", "https://decrypt.co/feed"),
            FeedSource::new("theblock", "https://www.theblock.co/rss.xml"),
        ]
    }

    fn pipeline(
        storage: Arc<dyn ArticleStorage>,
        model: Arc<DummyModel>,
        scraper: Arc<CannedScraper>,
    ) -> PipelineManager {
        PipelineManager::new(
            storage,
            ArticleAnalyzer::new(model),
            scraper,
            sources(),
            Logger::new().with_prefix("[test]"),
        )
        .with_article_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_cycle_stores_analyzed_articles() {
        let temp_dir = tempdir().unwrap();
        let storage = Arc::new(
            SQLiteStorage::new_with_path(&temp_dir.path().join("test.db"))
                .await
                .unwrap(),
        );
        let scraper = Arc::new(CannedScraper::new(vec![
            article("decrypt", "a", "Bitcoin climbs"),
            article("decrypt", "empty", "   "),
            article("theblock", "b", "Ether slides"),
        ]));
        let model = Arc::new(DummyModel::with_responses([ANALYSIS_JSON]));
        model.push_error("upstream timeout");

        let report = pipeline(storage.clone(), model.clone(), scraper.clone())
            .run_cycle()
            .await;

        assert_eq!(
            report,
            CycleReport {
                sources: 2,
                fetched: 3,
                skipped: 1,
                analyzed: 2,
                stored: 2,
                failed_analyses: 1,
                failed_stores: 0,
            }
        );
        assert_eq!(model.call_count(), 2);
        assert_eq!(*scraper.visited.lock().unwrap(), vec!["decrypt", "theblock"]);

        let stored = storage
            .get_by_url("https://decrypt.example/a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.summary, "Short summary");
        assert_eq!(stored.sentiment, "Bullish");

        let failed = storage
            .get_by_url("https://theblock.example/b")
            .await
            .unwrap()
            .unwrap();
        assert!(failed.summary.is_empty());
        let raw: serde_json::Value =
            serde_json::from_str(failed.analysis_raw.as_deref().unwrap()).unwrap();
        assert_eq!(raw["error"], "Analysis failed: Inference error: upstream timeout");

        assert!(storage
            .get_by_url("https://decrypt.example/empty")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_store_failures_do_not_abort_cycle() {
        let scraper = Arc::new(CannedScraper::new(vec![
            article("decrypt", "a", "One"),
            article("theblock", "b", "Two"),
        ]));
        let model = Arc::new(DummyModel::new());

        let report = pipeline(Arc::new(RejectingStorage), model.clone(), scraper)
            .run_cycle()
            .await;

        assert_eq!(report.analyzed, 2);
        assert_eq!(report.stored, 0);
        assert_eq!(report.failed_stores, 2);
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_rerun_replaces_existing_rows() {
        let temp_dir = tempdir().unwrap();
        let storage = Arc::new(
            SQLiteStorage::new_with_path(&temp_dir.path().join("test.db"))
                .await
                .unwrap(),
        );
        let scraper = Arc::new(CannedScraper::new(vec![article("decrypt", "a", "Body")]));
        let model = Arc::new(DummyModel::with_responses([ANALYSIS_JSON, ANALYSIS_JSON]));
        let manager = pipeline(storage.clone(), model, scraper);

        manager.run_cycle().await;
        manager.run_cycle().await;

        assert_eq!(storage.stats().await.unwrap().total_articles, 1);
    }
}
