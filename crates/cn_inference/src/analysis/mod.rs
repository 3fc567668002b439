use std::fmt;
use std::sync::Arc;

use cn_core::text::truncate_chars;
use cn_core::{Article, ArticleAnalysis, ChatModel, ChatRequest};
use serde_json::Value;
use tracing::{debug, error};

pub const ANALYSIS_SYSTEM_PROMPT: &str =
    "You are a cryptocurrency market analyst. Provide detailed analysis of crypto news articles.";

/// Characters of article content included in the prompt
pub const PROMPT_CONTENT_CHARS: usize = 3000;
pub const ANALYSIS_TEMPERATURE: f32 = 0.3;
pub const ANALYSIS_MAX_TOKENS: u32 = 500;

pub struct ArticleAnalyzer {
    model: Arc<dyn ChatModel>,
}

impl fmt::Debug for ArticleAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArticleAnalyzer")
            .field("model", &self.model.name())
            .finish()
    }
}

impl ArticleAnalyzer {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    pub fn build_request(article: &Article) -> ChatRequest {
        let user = format!(
            "Analyze this cryptocurrency news article and provide:\n\
             1. A concise summary (2-3 sentences)\n\
             2. Sentiment analysis (Bullish/Bearish/Neutral)\n\
             3. Key topics and cryptocurrencies mentioned\n\
             4. Market implications (if any)\n\
             \n\
             Title: {}\n\
             Content: {}\n\
             \n\
             Please format your response as JSON with keys: summary, sentiment, key_topics, market_implications",
            article.title,
            truncate_chars(&article.content, PROMPT_CONTENT_CHARS)
        );

        ChatRequest {
            system: ANALYSIS_SYSTEM_PROMPT.to_string(),
            user,
            temperature: ANALYSIS_TEMPERATURE,
            max_tokens: ANALYSIS_MAX_TOKENS,
        }
    }

    /// Never fails: request errors come back as [`ArticleAnalysis::Failed`].
    pub async fn analyze(&self, article: &Article) -> ArticleAnalysis {
        let request = Self::build_request(article);
        match self.model.complete(&request).await {
            Ok(text) => {
                let analysis = parse_analysis(&text);
                if let ArticleAnalysis::Unstructured { .. } = analysis {
                    debug!("🤷 Model reply for '{}' was not JSON, keeping raw text", article.title);
                }
                analysis
            }
            Err(e) => {
                error!("❌ Error analyzing article '{}': {}", article.title, e);
                ArticleAnalysis::Failed {
                    error: format!("Analysis failed: {}", e),
                }
            }
        }
    }
}

/// Keys the analysis prompt asks the model to return
pub const ANALYSIS_KEYS: [&str; 4] = ["summary", "sentiment", "key_topics", "market_implications"];

/// Interpret a model reply.
///
/// A JSON object carrying at least one of [`ANALYSIS_KEYS`] becomes `Structured`,
/// with any other keys kept in `extra`. Anything else is kept verbatim.
pub fn parse_analysis(text: &str) -> ArticleAnalysis {
    match serde_json::from_str::<Value>(strip_code_fence(text.trim())) {
        Ok(Value::Object(mut fields)) if ANALYSIS_KEYS.iter().any(|key| fields.contains_key(*key)) => {
            let summary = field_text(fields.remove("summary"));
            let sentiment = field_text(fields.remove("sentiment"));
            let key_topics = field_list(fields.remove("key_topics"));
            let market_implications = field_text(fields.remove("market_implications"));
            ArticleAnalysis::Structured {
                summary,
                sentiment,
                key_topics,
                market_implications,
                extra: fields,
            }
        }
        _ => ArticleAnalysis::Unstructured {
            raw_analysis: text.to_string(),
        },
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string line (```json)
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn field_text(value: Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    }
}

fn field_list(value: Option<Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) if s.trim().is_empty() => Vec::new(),
        Some(Value::String(s)) => vec![s],
        Some(other) => vec![other.to_string()],
    }
}
