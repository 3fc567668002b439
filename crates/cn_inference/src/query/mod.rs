use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use cn_core::{ArticleStorage, ChatModel, ChatRequest, Result, StoredArticle, DATETIME_FORMAT};
use tracing::{debug, error, info, warn};

pub const QUERY_SYSTEM_PROMPT: &str = "You are a cryptocurrency expert. Answer user questions based on the provided recent news articles. Be comprehensive and cite specific articles when relevant.";
pub const NO_RESULTS_MESSAGE: &str = "I couldn't find any relevant crypto news articles for your query.";

/// Maximum number of articles placed in the context block
pub const QUERY_ARTICLE_LIMIT: usize = 10;
pub const QUERY_TEMPERATURE: f32 = 0.4;
pub const QUERY_MAX_TOKENS: u32 = 1000;

/// Answers free-text questions from stored articles.
pub struct QueryEngine {
    storage: Arc<dyn ArticleStorage>,
    model: Arc<dyn ChatModel>,
    cache_ttl: Option<Duration>,
}

impl QueryEngine {
    pub fn new(storage: Arc<dyn ArticleStorage>, model: Arc<dyn ChatModel>) -> Self {
        Self {
            storage,
            model,
            cache_ttl: None,
        }
    }

    /// Serve repeated questions from the query cache while answers are younger than `ttl`.
    pub fn with_cache(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn search_terms(question: &str) -> Vec<String> {
        question.to_lowercase().split_whitespace().map(str::to_string).collect()
    }

    pub fn build_context(articles: &[StoredArticle]) -> String {
        let mut context = String::from("Recent cryptocurrency news articles:\n\n");
        for (i, article) in articles.iter().enumerate() {
            let published = article
                .published_at
                .map(|d| d.format(DATETIME_FORMAT).to_string())
                .unwrap_or_else(|| "unknown".to_string());

            let _ = writeln!(context, "{}. Title: {}", i + 1, article.title);
            let _ = writeln!(context, "   Source: {}", article.source);
            let _ = writeln!(context, "   Published: {}", published);
            let _ = writeln!(context, "   Summary: {}", article.summary);
            let _ = writeln!(context, "   Sentiment: {}", article.sentiment);
            if !article.key_topics.is_empty() {
                let _ = writeln!(context, "   Key Topics: {}", article.key_topics.join(", "));
            }
            let _ = writeln!(context, "   URL: {}\n", article.url);
        }
        context
    }

    pub fn build_request(question: &str, context: &str) -> ChatRequest {
        ChatRequest {
            system: QUERY_SYSTEM_PROMPT.to_string(),
            user: format!(
                "Based on these recent crypto news articles, please answer this question: {}\n\nNews Context:\n{}",
                question, context
            ),
            temperature: QUERY_TEMPERATURE,
            max_tokens: QUERY_MAX_TOKENS,
        }
    }

    /// Always produces user-facing text; failures are rendered as an apology.
    pub async fn answer(&self, question: &str) -> String {
        match self.try_answer(question).await {
            Ok(answer) => answer,
            Err(e) => {
                error!("❌ Error answering query: {}", e);
                format!("Sorry, I encountered an error while processing your query: {}", e)
            }
        }
    }

    async fn try_answer(&self, question: &str) -> Result<String> {
        if let Some(ttl) = self.cache_ttl {
            match self.storage.cached_response(question, ttl).await {
                Ok(Some(cached)) => {
                    debug!("📦 Answering from query cache");
                    return Ok(cached);
                }
                Ok(None) => {}
                Err(e) => warn!("⚠️ Query cache lookup failed: {}", e),
            }
        }

        let terms = Self::search_terms(question);
        let articles = self.storage.search_articles(&terms, QUERY_ARTICLE_LIMIT).await?;
        info!("🔍 Found {} articles for {} search terms", articles.len(), terms.len());

        if articles.is_empty() {
            return Ok(NO_RESULTS_MESSAGE.to_string());
        }

        let context = Self::build_context(&articles);
        let answer = self
            .model
            .complete(&Self::build_request(question, &context))
            .await?;

        if self.cache_ttl.is_some() {
            if let Err(e) = self.storage.cache_response(question, &answer).await {
                warn!("⚠️ Failed to cache query response: {}", e);
            }
        }

        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DummyModel;
    use chrono::{TimeZone, Utc};
    use cn_core::{Article, ArticleAnalysis};
    use cn_storage::SQLiteStorage;
    use tempfile::{tempdir, TempDir};

    async fn storage_with(articles: &[(&str, &str, &str)]) -> (Arc<SQLiteStorage>, TempDir) {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::new_with_path(&temp_dir.path().join("test.db"))
            .await
            .unwrap();
        for (i, (title, content, summary)) in articles.iter().enumerate() {
            let article = Article {
                title: title.to_string(),
                url: format!("https://news.example/{}", i),
                content: content.to_string(),
                source: "decrypt".to_string(),
                published_at: Some(Utc.with_ymd_and_hms(2024, 1, 10, 9, i as u32, 0).unwrap()),
            };
            let analysis = ArticleAnalysis::Structured {
                summary: summary.to_string(),
                sentiment: "Bullish".to_string(),
                key_topics: Vec::new(),
                market_implications: String::new(),
                extra: Default::default(),
            };
            storage.upsert_article(&article, &analysis).await.unwrap();
        }
        (Arc::new(storage), temp_dir)
    }

    #[test]
    fn test_search_terms() {
        assert_eq!(
            QueryEngine::search_terms("  Bitcoin\tETF  news "),
            vec!["bitcoin", "etf", "news"]
        );
        assert!(QueryEngine::search_terms("   ").is_empty());
    }

    #[tokio::test]
    async fn test_no_matches_skips_model() {
        let (storage, _dir) = storage_with(&[("Bitcoin rallies", "ETF inflows", "Rally")]).await;
        let model = Arc::new(DummyModel::new());
        let engine = QueryEngine::new(storage, model.clone());

        let answer = engine.answer("dogecoin lawsuit").await;
        assert_eq!(answer, NO_RESULTS_MESSAGE);
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_matching_article_reaches_model() {
        let (storage, _dir) = storage_with(&[
            ("Bitcoin rallies", "Spot ETF inflows hit a record", "Rally continues"),
            ("Ethereum upgrade", "Validators prepare", "Upgrade soon"),
        ])
        .await;
        let model = Arc::new(DummyModel::with_responses(["Bitcoin is up on ETF demand [1]."]));
        let engine = QueryEngine::new(storage, model.clone());

        let answer = engine.answer("bitcoin etf").await;
        assert_eq!(answer, "Bitcoin is up on ETF demand [1].");

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.system, QUERY_SYSTEM_PROMPT);
        assert_eq!(request.temperature, QUERY_TEMPERATURE);
        assert_eq!(request.max_tokens, QUERY_MAX_TOKENS);
        assert!(request
            .user
            .starts_with("Based on these recent crypto news articles, please answer this question: bitcoin etf"));
        assert!(request.user.contains("1. Title: Bitcoin rallies"));
        assert!(!request.user.contains("Ethereum upgrade"));
    }

    #[tokio::test]
    async fn test_model_failure_becomes_message() {
        let (storage, _dir) = storage_with(&[("Bitcoin rallies", "ETF inflows", "Rally")]).await;
        let model = Arc::new(DummyModel::new());
        model.push_error("rate limited");
        let engine = QueryEngine::new(storage, model);

        let answer = engine.answer("bitcoin").await;
        assert_eq!(
            answer,
            "Sorry, I encountered an error while processing your query: Inference error: rate limited"
        );
    }

    #[tokio::test]
    async fn test_blank_question_uses_recent_articles() {
        let (storage, _dir) = storage_with(&[("Bitcoin rallies", "ETF inflows", "Rally")]).await;
        let model = Arc::new(DummyModel::with_responses(["Here is the latest."]));
        let engine = QueryEngine::new(storage, model.clone());

        assert_eq!(engine.answer("   ").await, "Here is the latest.");
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cached_answer_reused() {
        let (storage, _dir) = storage_with(&[("Bitcoin rallies", "ETF inflows", "Rally")]).await;
        let model = Arc::new(DummyModel::with_responses(["First answer", "Second answer"]));
        let engine = QueryEngine::new(storage, model.clone()).with_cache(Duration::from_secs(3600));

        assert_eq!(engine.answer("bitcoin").await, "First answer");
        assert_eq!(engine.answer("bitcoin").await, "First answer");
        assert_eq!(model.call_count(), 1);

        // Apologies are not cached
        assert_eq!(engine.answer("solana").await, NO_RESULTS_MESSAGE);
        assert_eq!(engine.answer("bitcoin rallies").await, "Second answer");
    }

    #[test]
    fn test_build_context_format() {
        let article = StoredArticle {
            id: 1,
            title: "Bitcoin rallies".to_string(),
            url: "https://news.example/1".to_string(),
            content: String::new(),
            summary: "Rally continues".to_string(),
            sentiment: "Bullish".to_string(),
            impact: String::new(),
            key_topics: vec!["Bitcoin".to_string(), "ETF".to_string()],
            related_coins: None,
            category: None,
            source: "decrypt".to_string(),
            published_at: Some(Utc.with_ymd_and_hms(2024, 1, 10, 9, 30, 0).unwrap()),
            fetched_at: None,
            analysis_raw: None,
        };
        let mut untagged = article.clone();
        untagged.key_topics.clear();
        untagged.published_at = None;

        let context = QueryEngine::build_context(&[article, untagged]);
        assert_eq!(
            context,
            "Recent cryptocurrency news articles:\n\n\
             1. Title: Bitcoin rallies\n   Source: decrypt\n   Published: 2024-01-10 09:30:00\n   \
             Summary: Rally continues\n   Sentiment: Bullish\n   Key Topics: Bitcoin, ETF\n   \
             URL: https://news.example/1\n\n\
             2. Title: Bitcoin rallies\n   Source: decrypt\n   Published: unknown\n   \
             Summary: Rally continues\n   Sentiment: Bullish\n   \
             URL: https://news.example/1\n\n"
        );
    }
}
