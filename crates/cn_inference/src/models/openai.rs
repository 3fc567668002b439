use std::fmt;

use async_trait::async_trait;
use cn_core::config::AppConfig;
use cn_core::{ChatModel, ChatRequest, Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

/// Chat completions against any OpenAI-compatible endpoint.
pub struct OpenAiModel {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiModel {
    /// Fails immediately when no API key is configured.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::Config("OpenAI API key is required".to_string()))?;

        let client = Client::builder().timeout(config.llm_timeout).build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl fmt::Debug for OpenAiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl ChatModel for OpenAiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let body = CompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!(
                "Completion request failed with {}: {}",
                status,
                detail.trim()
            )));
        }

        let completion = response.json::<CompletionResponse>().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::Inference("Completion response contained no message".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    fn config_with_key(api_key: Option<&str>) -> AppConfig {
        AppConfig {
            api_key: api_key.map(str::to_string),
            ..AppConfig::default()
        }
    }

    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/v1", addr)
    }

    #[test]
    fn test_model_requires_api_key() {
        let result = OpenAiModel::new(&config_with_key(None));
        assert!(matches!(result, Err(Error::Config(_))));
        assert_eq!(
            result.unwrap_err().to_string(),
            "Configuration error: OpenAI API key is required"
        );

        assert!(OpenAiModel::new(&config_with_key(Some("   "))).is_err());
        assert!(OpenAiModel::new(&config_with_key(Some("sk-test"))).is_ok());
    }

    #[test]
    fn test_endpoint_and_debug() {
        let config = AppConfig {
            api_key: Some("sk-test".to_string()),
            api_base: "https://llm.example.com/v1/".to_string(),
            ..AppConfig::default()
        };
        let model = OpenAiModel::new(&config).unwrap();
        assert_eq!(model.endpoint(), "https://llm.example.com/v1/chat/completions");
        assert_eq!(model.name(), "gpt-4.1-mini");
        let rendered = format!("{:?}", model);
        assert!(!rendered.contains("sk-test"));
    }

    #[tokio::test]
    async fn test_complete_sends_messages_and_limits() {
        let captured: Arc<Mutex<Option<(Option<String>, Value)>>> = Arc::new(Mutex::new(None));
        let sink = captured.clone();
        let router = Router::new().route(
            "/v1/chat/completions",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let sink = sink.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    *sink.lock().unwrap() = Some((auth, body));
                    Json(json!({
                        "choices": [{"message": {"role": "assistant", "content": "{\"summary\":\"ok\"}"}}]
                    }))
                }
            }),
        );
        let base = spawn_server(router).await;

        let config = AppConfig {
            api_key: Some("sk-test".to_string()),
            api_base: base,
            ..AppConfig::default()
        };
        let model = OpenAiModel::new(&config).unwrap();
        let request = ChatRequest {
            system: "You are terse.".to_string(),
            user: "Say ok".to_string(),
            temperature: 0.3,
            max_tokens: 500,
        };

        let text = model.complete(&request).await.unwrap();
        assert_eq!(text, "{\"summary\":\"ok\"}");

        let (auth, body) = captured.lock().unwrap().take().unwrap();
        assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
        assert_eq!(body["model"], "gpt-4.1-mini");
        assert_eq!(body["max_tokens"], 500);
        assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are terse.");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Say ok");
    }

    #[tokio::test]
    async fn test_complete_reports_http_failure() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "quota exceeded") }),
        );
        let base = spawn_server(router).await;

        let config = AppConfig {
            api_key: Some("sk-test".to_string()),
            api_base: base,
            ..AppConfig::default()
        };
        let model = OpenAiModel::new(&config).unwrap();
        let request = ChatRequest {
            system: String::new(),
            user: "hi".to_string(),
            temperature: 0.4,
            max_tokens: 10,
        };

        let err = model.complete(&request).await.unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("quota exceeded"));
    }
}
