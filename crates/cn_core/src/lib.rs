pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod storage;
pub mod text;
pub mod types;

pub use error::{Error, Result};
pub use logging::Logger;
pub use models::{ChatModel, ChatRequest};
pub use storage::ArticleStorage;
pub use types::{
    Article, ArticleAnalysis, CycleReport, DatabaseStats, FeedSource, StoredArticle, DATETIME_FORMAT,
};

pub mod prelude {
    pub use super::{Article, ArticleAnalysis, ArticleStorage, ChatModel, Error, Result};
}
