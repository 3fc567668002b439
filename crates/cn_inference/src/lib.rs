pub mod analysis;
pub mod models;
pub mod query;

pub use analysis::ArticleAnalyzer;
pub use models::create_model;
pub use query::QueryEngine;

pub mod prelude {
    pub use super::analysis::{parse_analysis, ArticleAnalyzer};
    pub use super::models::{create_model, DummyModel, OpenAiModel};
    pub use super::query::QueryEngine;
    pub use cn_core::{Article, ArticleAnalysis, ChatModel, ChatRequest, Error, Result};
}
