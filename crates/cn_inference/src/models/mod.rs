use std::sync::Arc;

use cn_core::config::{AppConfig, ModelProvider};
use cn_core::{ChatModel, Result};

pub mod dummy;
pub mod openai;

pub use dummy::DummyModel;
pub use openai::OpenAiModel;

/// Build the chat model selected by `config.provider`.
pub fn create_model(config: &AppConfig) -> Result<Arc<dyn ChatModel>> {
    let model: Arc<dyn ChatModel> = match config.provider {
        ModelProvider::OpenAi => Arc::new(OpenAiModel::new(config)?),
        ModelProvider::Dummy => Arc::new(DummyModel::new()),
    };
    tracing::info!("🧠 Inference model initialized (using {})", model.name());
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_model_without_key() {
        let config = AppConfig::default();
        assert!(create_model(&config).is_err());

        let config = AppConfig {
            provider: ModelProvider::Dummy,
            ..AppConfig::default()
        };
        assert_eq!(create_model(&config).unwrap().name(), "Dummy");
    }
}
