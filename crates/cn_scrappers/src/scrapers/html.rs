use std::time::Duration;

use async_trait::async_trait;
use cn_core::text::truncate_chars;
use cn_core::Result;
use reqwest::Client;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, error};

use super::{http_client, ContentExtractor};

pub const MAX_CONTENT_CHARS: usize = 4000;

/// Tried in order; the first one with visible text wins.
pub const CONTENT_SELECTORS: &[&str] = &[
    "article",
    ".article-content",
    ".post-content",
    "main",
    ".content",
];

/// Text inside these elements never counts as article content
pub const STRIPPED_TAGS: &[&str] = &["script", "style", "nav", "footer", "header"];

#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    client: Client,
}

impl HtmlExtractor {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
        })
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl ContentExtractor for HtmlExtractor {
    async fn extract(&self, url: &str) -> String {
        match self.fetch_html(url).await {
            Ok(html) => {
                let content = extract_main_text(&html, MAX_CONTENT_CHARS);
                debug!("📄 Extracted {} chars from {}", content.chars().count(), url);
                content
            }
            Err(e) => {
                error!("❌ Error extracting content from {}: {}", url, e);
                String::new()
            }
        }
    }
}

/// Visible main text of an HTML document, capped at `max_chars` characters.
pub fn extract_main_text(html: &str, max_chars: usize) -> String {
    let document = Html::parse_document(html);

    let content = CONTENT_SELECTORS
        .iter()
        .filter_map(|selector| Selector::parse(selector).ok())
        .find_map(|selector| {
            document
                .select(&selector)
                .find(|element| !element.ancestors().any(|node| is_stripped(node.value())))
                .map(visible_text)
                .filter(|text| !text.is_empty())
        })
        .unwrap_or_else(|| visible_text(document.root_element()));

    truncate_chars(&content, max_chars).to_string()
}

fn visible_text(root: ElementRef<'_>) -> String {
    let mut fragments = Vec::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let fragment = text.trim();
        if fragment.is_empty() || node.ancestors().any(|ancestor| is_stripped(ancestor.value())) {
            continue;
        }
        fragments.push(fragment);
    }
    fragments.join(" ")
}

fn is_stripped(node: &Node) -> bool {
    node.as_element()
        .map_or(false, |element| STRIPPED_TAGS.contains(&element.name()))
}
