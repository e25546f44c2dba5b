use crate::traits::{Embedder, IndexAdmin, VectorIndex};
use crate::{DocumentChunk, IndexDescription, IndexSpec, ServiceError};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const EMBEDDING_BATCH_SIZE: usize = 1_000;
pub const UPSERT_BATCH_SIZE: usize = 32;

pub struct IndexManager<A: IndexAdmin> {
    admin: A,
    spec: IndexSpec,
    poll_interval: Duration,
}

impl<A: IndexAdmin> IndexManager<A> {
    pub fn new(admin: A, spec: IndexSpec) -> Self {
        Self {
            admin,
            spec,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn admin(&self) -> &A {
        &self.admin
    }

    pub async fn ensure_ready(&self) -> Result<IndexDescription, ServiceError> {
        let names = self.admin.list_index_names().await?;

        if names.iter().any(|name| name == &self.spec.name) {
            info!(index = %self.spec.name, "index already exists");
        } else {
            info!(
                index = %self.spec.name,
                dimension = self.spec.dimension,
                cloud = %self.spec.cloud,
                region = %self.spec.region,
                "creating index"
            );
            self.admin.create_index(&self.spec).await?;
        }

        let description = self.wait_until_ready().await?;

        if let Some(dimension) = description.dimension {
            if dimension != self.spec.dimension {
                return Err(ServiceError::Request(format!(
                    "index {} has dimension {} but embeddings have {}",
                    description.name, dimension, self.spec.dimension
                )));
            }
        }

        Ok(description)
    }

    async fn wait_until_ready(&self) -> Result<IndexDescription, ServiceError> {
        loop {
            let description = self.admin.describe_index(&self.spec.name).await?;
            if description.ready {
                info!(index = %description.name, host = %description.host, "index ready");
                return Ok(description);
            }

            debug!(index = %description.name, state = %description.state, "waiting for index");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulateReport {
    pub upserted: usize,
    pub already_populated: Option<u64>,
}

pub async fn populate_namespace<E, V>(
    embedder: &E,
    index: &V,
    namespace: &str,
    chunks: &[DocumentChunk],
    reindex: bool,
) -> Result<PopulateReport, ServiceError>
where
    E: Embedder + ?Sized,
    V: VectorIndex + ?Sized,
{
    if !reindex {
        let existing = index.namespace_vector_count(namespace).await?;
        if existing > 0 {
            info!(namespace, existing, "namespace already populated, skipping upsert");
            return Ok(PopulateReport {
                upserted: 0,
                already_populated: Some(existing),
            });
        }
    }

    let mut upserted = 0;
    for batch in chunks.chunks(EMBEDDING_BATCH_SIZE) {
        let texts = batch.iter().map(|chunk| chunk.text.clone()).collect::<Vec<_>>();
        let embeddings = embedder.embed_documents(&texts).await?;

        for (chunk_batch, embedding_batch) in batch
            .chunks(UPSERT_BATCH_SIZE)
            .zip(embeddings.chunks(UPSERT_BATCH_SIZE))
        {
            index
                .upsert_chunks(namespace, chunk_batch, embedding_batch)
                .await?;
            upserted += chunk_batch.len();
        }

        info!(namespace, upserted, total = chunks.len(), "upsert progress");
    }

    Ok(PopulateReport {
        upserted,
        already_populated: None,
    })
}
