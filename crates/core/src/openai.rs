use crate::error::check_status;
use crate::ServiceError;
use reqwest::Client;
use serde_json::Value;
use url::Url;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

// No Debug derive: the API key must not end up in logs.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            api_key: api_key.into(),
            client: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ServiceError> {
        let parsed = Url::parse(base_url)?;
        self.base_url = parsed.as_str().trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ServiceError> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let response = check_status("openai", response).await?;
        Ok(response.json().await?)
    }
}
