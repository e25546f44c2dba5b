use crate::traits::{Embedder, VectorIndex};
use crate::{SearchHit, ServiceError};
use tracing::debug;

pub const DEFAULT_TOP_K: usize = 4;

pub struct Retriever<E, V> {
    embedder: E,
    index: V,
    namespace: String,
}

impl<E, V> Retriever<E, V>
where
    E: Embedder,
    V: VectorIndex,
{
    pub fn new(embedder: E, index: V, namespace: impl Into<String>) -> Self {
        Self {
            embedder,
            index,
            namespace: namespace.into(),
        }
    }

    pub fn index(&self) -> &V {
        &self.index
    }

    pub async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, ServiceError> {
        if query.trim().is_empty() {
            return Err(ServiceError::Request("query is empty".to_string()));
        }

        if k == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed_query(query).await?;
        let mut hits = self.index.query(&self.namespace, &vector, k).await?;
        hits.truncate(k);

        debug!(namespace = %self.namespace, k, hits = hits.len(), "similarity search");
        Ok(hits)
    }
}
