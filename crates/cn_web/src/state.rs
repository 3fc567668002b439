use std::sync::Arc;

use cn_core::ArticleStorage;
use cn_inference::QueryEngine;
use cn_scrappers::PipelineManager;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn ArticleStorage>,
    pub pipeline: Arc<PipelineManager>,
    pub query_engine: Arc<QueryEngine>,
}
