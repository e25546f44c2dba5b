use crate::openai::OpenAiClient;
use crate::traits::ChatModel;
use crate::{ChatMessage, ServiceError};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

#[derive(Clone)]
pub struct OpenAiChat {
    client: OpenAiClient,
    model: String,
    temperature: f32,
}

impl OpenAiChat {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: 0.0,
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ServiceError> {
        debug!(model = %self.model, messages = messages.len(), "requesting chat completion");

        let parsed = self
            .client
            .post_json(
                "chat/completions",
                &json!({
                    "model": self.model,
                    "messages": messages,
                    "temperature": self.temperature,
                }),
            )
            .await?;

        parsed
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ServiceError::malformed("openai", "completion has no message content"))
    }
}
