use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// One chat-completion call: a system message, a user message and sampling limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    fn name(&self) -> &str;

    /// Send the request and return the generated text
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}
