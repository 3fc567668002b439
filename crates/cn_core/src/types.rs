use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Datetime layout used for persisted timestamps and rendered dates.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A freshly fetched feed entry with its extracted page text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub content: String,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// An article row as read back from the content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredArticle {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub content: String,
    pub summary: String,
    pub sentiment: String,
    pub impact: String,
    pub key_topics: Vec<String>,
    pub related_coins: Option<String>,
    pub category: Option<String>,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub analysis_raw: Option<String>,
}

/// Result of asking the model to analyze one article.
///
/// Serialized untagged, so the persisted payload is one of
/// `{"summary", "sentiment", "key_topics", "market_implications", ..extra}`,
/// `{"raw_analysis"}` or `{"error"}`. Keys the model added beyond the four
/// expected ones are kept in `extra` and persisted alongside them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArticleAnalysis {
    Structured {
        summary: String,
        sentiment: String,
        #[serde(default)]
        key_topics: Vec<String>,
        #[serde(default)]
        market_implications: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Unstructured {
        raw_analysis: String,
    },
    Failed {
        error: String,
    },
}

impl ArticleAnalysis {
    pub fn summary(&self) -> &str {
        match self {
            Self::Structured { summary, .. } => summary,
            _ => "",
        }
    }

    pub fn sentiment(&self) -> &str {
        match self {
            Self::Structured { sentiment, .. } => sentiment,
            _ => "",
        }
    }

    pub fn key_topics(&self) -> &[String] {
        match self {
            Self::Structured { key_topics, .. } => key_topics,
            _ => &[],
        }
    }

    pub fn market_implications(&self) -> &str {
        match self {
            Self::Structured { market_implications, .. } => market_implications,
            _ => "",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub total_articles: i64,
    pub articles_today: i64,
    pub articles_by_source: BTreeMap<String, i64>,
}

/// A named RSS/Atom feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Counters collected over one fetch-and-analyze cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub sources: usize,
    pub fetched: usize,
    pub skipped: usize,
    pub analyzed: usize,
    pub stored: usize,
    pub failed_analyses: usize,
    pub failed_stores: usize,
}
