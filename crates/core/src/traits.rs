use crate::{
    ChatMessage, ChatTurn, DocumentChunk, IndexDescription, IndexSpec, SearchHit, ServiceError,
};
use async_trait::async_trait;

#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    /// Returns one vector per input, in input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| ServiceError::malformed("embeddings", "no vector returned for query"))
    }
}

#[async_trait]
pub trait IndexAdmin: Send + Sync {
    async fn list_index_names(&self) -> Result<Vec<String>, ServiceError>;

    async fn describe_index(&self, name: &str) -> Result<IndexDescription, ServiceError>;

    async fn create_index(&self, spec: &IndexSpec) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert_chunks(
        &self,
        namespace: &str,
        chunks: &[DocumentChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), ServiceError>;

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>, ServiceError>;

    async fn namespace_vector_count(&self, namespace: &str) -> Result<u64, ServiceError>;
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ServiceError>;
}

#[async_trait]
pub trait QuestionAnswerer: Send + Sync {
    async fn answer_question(
        &self,
        question: &str,
        history: &[ChatTurn],
    ) -> Result<String, ServiceError>;
}
