use std::sync::Arc;

use cn_core::config::AppConfig;
use cn_core::{ArticleStorage, Logger, Result};
use cn_inference::{create_model, ArticleAnalyzer, QueryEngine};
use cn_scrappers::{HtmlExtractor, PipelineManager, RssScraper, Scheduler, SchedulerHandle};
use cn_web::AppState;

/// Everything a surface needs: shared services plus the background scheduler, if started.
pub struct AppContext {
    pub config: AppConfig,
    pub logger: Logger,
    pub storage: Arc<dyn ArticleStorage>,
    pub pipeline: Arc<PipelineManager>,
    pub query_engine: Arc<QueryEngine>,
    scheduler: Option<SchedulerHandle>,
}

impl AppContext {
    pub async fn build(config: AppConfig, logger: Logger) -> Result<Self> {
        let model = create_model(&config)?;
        let storage = cn_storage::create_storage(&config.db_path).await?;

        let extractor = Arc::new(HtmlExtractor::new(config.page_timeout)?);
        let scraper = Arc::new(RssScraper::new(extractor, config.page_timeout)?);
        let pipeline = PipelineManager::new(
            storage.clone(),
            ArticleAnalyzer::new(model.clone()),
            scraper,
            config.sources.clone(),
            logger.with_prefix("[pipeline]"),
        )
        .with_article_delay(config.article_delay);

        let mut query_engine = QueryEngine::new(storage.clone(), model);
        if !config.cache_ttl.is_zero() {
            query_engine = query_engine.with_cache(config.cache_ttl);
        }

        let names: Vec<&str> = config.sources.iter().map(|s| s.name.as_str()).collect();
        logger.info(&format!("🦗 Feed sources: {}", names.join(", ")));

        Ok(Self {
            config,
            logger,
            storage,
            pipeline: Arc::new(pipeline),
            query_engine: Arc::new(query_engine),
            scheduler: None,
        })
    }

    /// Returns false when a scheduler is already running.
    pub fn start_scheduler(&mut self) -> bool {
        if self.scheduler_running() {
            return false;
        }
        self.scheduler = Some(Scheduler::spawn(
            self.pipeline.clone(),
            self.config.fetch_interval,
            self.logger.with_prefix("[scheduler]"),
        ));
        true
    }

    pub fn scheduler_running(&self) -> bool {
        self.scheduler.as_ref().map_or(false, SchedulerHandle::is_running)
    }

    /// Stop the scheduler, letting a cycle in flight finish.
    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.scheduler.take() {
            self.logger.info("⏳ Waiting for the background fetcher to stop");
            handle.stop().await;
        }
    }

    pub fn web_state(&self) -> AppState {
        AppState {
            storage: self.storage.clone(),
            pipeline: self.pipeline.clone(),
            query_engine: self.query_engine.clone(),
        }
    }
}
