use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::types::FeedSource;
use crate::{Error, Result};

pub const DEFAULT_DB_PATH: &str = "crypto_news.db";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Built-in feeds, in processing order.
pub fn default_sources() -> Vec<FeedSource> {
    vec![
        FeedSource::new("decrypt", "https://decrypt.co/feed"),
        FeedSource::new("theblock", "https://www.theblock.co/rss.xml"),
        FeedSource::new("cryptonews", "https://cryptonews.com/news/feed/"),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProvider {
    OpenAi,
    Dummy,
}

impl FromStr for ModelProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "dummy" => Ok(Self::Dummy),
            other => Err(Error::Config(format!(
                "Unknown model provider '{}'. Available providers: openai, dummy",
                other
            ))),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub provider: ModelProvider,
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub sources: Vec<FeedSource>,
    pub fetch_interval: Duration,
    pub article_delay: Duration,
    pub page_timeout: Duration,
    pub llm_timeout: Duration,
    pub cache_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            provider: ModelProvider::OpenAi,
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            sources: default_sources(),
            fetch_interval: Duration::from_secs(4 * 3600),
            article_delay: Duration::from_secs(1),
            page_timeout: Duration::from_secs(10),
            llm_timeout: Duration::from_secs(60),
            cache_ttl: Duration::from_secs(4 * 3600),
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("db_path", &self.db_path)
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("sources", &self.sources)
            .field("fetch_interval", &self.fetch_interval)
            .field("article_delay", &self.article_delay)
            .field("page_timeout", &self.page_timeout)
            .field("llm_timeout", &self.llm_timeout)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

/// Parse a `name=url` feed definition.
pub fn parse_source(definition: &str) -> Result<FeedSource> {
    let (name, url) = definition
        .split_once('=')
        .ok_or_else(|| Error::Config(format!("Invalid source '{}'. Expected: name=url", definition)))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Config(format!("Source name is empty in '{}'", definition)));
    }
    let url = Url::parse(url.trim())
        .map_err(|e| Error::Config(format!("Invalid feed URL for '{}': {}", name, e)))?;
    Ok(FeedSource::new(name, url.to_string()))
}

/// Parse durations such as `4h`, `30m`, `1h15m30s` or bare seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let mut total_seconds = 0u64;
    let mut current_number = String::new();
    let mut has_value = false;

    for c in s.chars() {
        if c.is_ascii_digit() {
            current_number.push(c);
        } else if !current_number.is_empty() {
            let unit = match c {
                's' => 1,
                'm' => 60,
                'h' => 3600,
                'd' => 86400,
                _ => return Err(Error::Config(format!("Invalid duration unit: {}", c))),
            };
            total_seconds = add_component(total_seconds, &current_number, unit)?;
            current_number.clear();
            has_value = true;
        } else if !c.is_whitespace() {
            return Err(Error::Config(format!("Invalid character in duration: {}", c)));
        }
    }

    // A trailing number without a unit counts as seconds
    if !current_number.is_empty() {
        total_seconds = add_component(total_seconds, &current_number, 1)?;
        has_value = true;
    }

    if !has_value {
        return Err(Error::Config("Duration must include a number".to_string()));
    }

    Ok(Duration::from_secs(total_seconds))
}

fn add_component(total_seconds: u64, digits: &str, unit: u64) -> Result<u64> {
    digits
        .parse::<u64>()
        .ok()
        .and_then(|num| num.checked_mul(unit))
        .and_then(|seconds| total_seconds.checked_add(seconds))
        .ok_or_else(|| Error::Config("Duration too large".to_string()))
}
