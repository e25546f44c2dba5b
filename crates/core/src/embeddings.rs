use crate::openai::OpenAiClient;
use crate::traits::Embedder;
use crate::ServiceError;
use async_trait::async_trait;
use serde_json::{json, Value};

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: OpenAiClient,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    // `dimensions` is only sent when shortening; older models reject the field.
    fn request_body(&self, texts: &[String]) -> Value {
        let mut body = json!({
            "model": self.model,
            "input": texts,
        });
        if native_dimensions(&self.model) != Some(self.dimensions) {
            body["dimensions"] = json!(self.dimensions);
        }
        body
    }
}

fn native_dimensions(model: &str) -> Option<usize> {
    match model {
        "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        _ => None,
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let parsed = self
            .client
            .post_json("embeddings", &self.request_body(texts))
            .await?;

        let vectors = parse_embedding_response(&parsed)?;
        if vectors.len() != texts.len() {
            return Err(ServiceError::malformed(
                "openai",
                format!("{} embeddings returned for {} inputs", vectors.len(), texts.len()),
            ));
        }

        if let Some(vector) = vectors.iter().find(|vector| vector.len() != self.dimensions) {
            return Err(ServiceError::malformed(
                "openai",
                format!("embedding dimension {} != {}", vector.len(), self.dimensions),
            ));
        }

        Ok(vectors)
    }
}

// Entries carry an `index`; the API does not promise they arrive in order.
fn parse_embedding_response(parsed: &Value) -> Result<Vec<Vec<f32>>, ServiceError> {
    let data = parsed
        .pointer("/data")
        .and_then(Value::as_array)
        .ok_or_else(|| ServiceError::malformed("openai", "embedding response has no data array"))?;

    let mut indexed = data
        .iter()
        .enumerate()
        .map(|(position, item)| {
            let index = item
                .pointer("/index")
                .and_then(Value::as_u64)
                .unwrap_or(position as u64);
            let vector = item
                .pointer("/embedding")
                .and_then(Value::as_array)
                .ok_or_else(|| ServiceError::malformed("openai", "embedding entry has no vector"))?
                .iter()
                .map(|value| value.as_f64().map(|number| number as f32))
                .collect::<Option<Vec<f32>>>()
                .ok_or_else(|| ServiceError::malformed("openai", "embedding vector is not numeric"))?;
            Ok((index, vector))
        })
        .collect::<Result<Vec<_>, ServiceError>>()?;

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
}
