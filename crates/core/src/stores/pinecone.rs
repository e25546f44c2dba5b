use crate::error::check_status;
use crate::traits::{IndexAdmin, VectorIndex};
use crate::{DocumentChunk, IndexDescription, IndexSpec, SearchHit, ServiceError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_CONTROL_PLANE_URL: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2024-07";
const BACKEND: &str = "pinecone";

#[derive(Clone)]
pub struct PineconeClient {
    endpoint: String,
    api_key: String,
    client: Client,
}

impl PineconeClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_CONTROL_PLANE_URL.to_string(),
            api_key: api_key.into(),
            client: Client::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self, ServiceError> {
        let parsed = Url::parse(endpoint)?;
        self.endpoint = parsed.as_str().trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn index(&self, host: &str) -> PineconeIndex {
        PineconeIndex {
            host_url: host_url(host),
            api_key: self.api_key.clone(),
            client: self.client.clone(),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        authorized(request, &self.api_key)
    }
}

fn authorized(request: RequestBuilder, api_key: &str) -> RequestBuilder {
    request
        .header("Api-Key", api_key)
        .header("X-Pinecone-API-Version", API_VERSION)
}

fn host_url(host: &str) -> String {
    let trimmed = host.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

fn parse_description(value: &Value) -> Result<IndexDescription, ServiceError> {
    let name = value
        .pointer("/name")
        .and_then(Value::as_str)
        .ok_or_else(|| ServiceError::malformed(BACKEND, "index description has no name"))?;

    Ok(IndexDescription {
        name: name.to_string(),
        host: value
            .pointer("/host")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        dimension: value
            .pointer("/dimension")
            .and_then(Value::as_u64)
            .map(|dimension| dimension as usize),
        ready: value
            .pointer("/status/ready")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        state: value
            .pointer("/status/state")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string(),
    })
}

#[async_trait]
impl IndexAdmin for PineconeClient {
    async fn list_index_names(&self) -> Result<Vec<String>, ServiceError> {
        let response = self
            .authorized(self.client.get(format!("{}/indexes", self.endpoint)))
            .send()
            .await?;
        let parsed: Value = check_status(BACKEND, response).await?.json().await?;

        Ok(parsed
            .pointer("/indexes")
            .and_then(Value::as_array)
            .map(|indexes| {
                indexes
                    .iter()
                    .filter_map(|index| index.pointer("/name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn describe_index(&self, name: &str) -> Result<IndexDescription, ServiceError> {
        let response = self
            .authorized(self.client.get(format!("{}/indexes/{}", self.endpoint, name)))
            .send()
            .await?;
        let parsed: Value = check_status(BACKEND, response).await?.json().await?;
        parse_description(&parsed)
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<(), ServiceError> {
        let response = self
            .authorized(self.client.post(format!("{}/indexes", self.endpoint)))
            .json(&json!({
                "name": spec.name,
                "dimension": spec.dimension,
                "metric": spec.metric,
                "spec": {
                    "serverless": {
                        "cloud": spec.cloud,
                        "region": spec.region,
                    }
                }
            }))
            .send()
            .await?;

        // Another process created it between our list and create calls.
        if response.status() == StatusCode::CONFLICT {
            info!(index = %spec.name, "index was created concurrently");
            return Ok(());
        }

        check_status(BACKEND, response).await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PineconeIndex {
    host_url: String,
    api_key: String,
    client: Client,
}

// Typed so that `values` serialize as f32, not as f64 widened by `json!`.
#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    namespace: &'a str,
}

#[derive(Debug, Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: VectorMetadata<'a>,
}

// `text` and `source` are the metadata keys LangChain-populated indexes use.
#[derive(Debug, Serialize)]
struct VectorMetadata<'a> {
    text: &'a str,
    source: &'a str,
    chunk_index: u64,
}

fn upsert_request<'a>(
    namespace: &'a str,
    chunks: &'a [DocumentChunk],
    embeddings: &'a [Vec<f32>],
) -> UpsertRequest<'a> {
    let vectors = chunks
        .iter()
        .zip(embeddings.iter())
        .map(|(chunk, embedding)| UpsertVector {
            id: &chunk.chunk_id,
            values: embedding,
            metadata: VectorMetadata {
                text: &chunk.text,
                source: chunk.source_path.as_deref().unwrap_or_default(),
                chunk_index: chunk.chunk_index,
            },
        })
        .collect();

    UpsertRequest { vectors, namespace }
}

impl PineconeIndex {
    async fn post<B>(&self, path: &str, body: &B) -> Result<Value, ServiceError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let response = authorized(
            self.client.post(format!("{}/{}", self.host_url, path)),
            &self.api_key,
        )
        .json(body)
        .send()
        .await?;

        Ok(check_status(BACKEND, response).await?.json().await?)
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert_chunks(
        &self,
        namespace: &str,
        chunks: &[DocumentChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), ServiceError> {
        if chunks.len() != embeddings.len() {
            return Err(ServiceError::Request(format!(
                "embedding count {} doesn't match chunk count {}",
                embeddings.len(),
                chunks.len()
            )));
        }

        if chunks.is_empty() {
            return Ok(());
        }

        let parsed = self
            .post("vectors/upsert", &upsert_request(namespace, chunks, embeddings))
            .await?;

        let upserted = parsed
            .pointer("/upsertedCount")
            .and_then(Value::as_u64)
            .unwrap_or_default();
        debug!(namespace, upserted, "upserted vectors");
        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>, ServiceError> {
        let parsed = self
            .post(
                "query",
                &json!({
                    "namespace": namespace,
                    "vector": vector,
                    "topK": top_k,
                    "includeMetadata": true,
                    "includeValues": false,
                }),
            )
            .await?;

        let matches = parsed
            .pointer("/matches")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(matches
            .iter()
            .map(|hit| SearchHit {
                id: hit
                    .pointer("/id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                score: hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0),
                text: hit
                    .pointer("/metadata/text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                source: hit
                    .pointer("/metadata/source")
                    .and_then(Value::as_str)
                    .filter(|source| !source.is_empty())
                    .map(str::to_string),
            })
            .collect())
    }

    async fn namespace_vector_count(&self, namespace: &str) -> Result<u64, ServiceError> {
        let parsed = self.post("describe_index_stats", &json!({})).await?;

        Ok(parsed
            .pointer("/namespaces")
            .and_then(Value::as_object)
            .and_then(|namespaces| namespaces.get(namespace))
            .and_then(|stats| stats.pointer("/vectorCount"))
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::make_chunk;
    use crate::index::UPSERT_BATCH_SIZE;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn control(server: &MockServer) -> PineconeClient {
        PineconeClient::new("pc-test")
            .with_endpoint(&server.uri())
            .expect("mock uri is a valid url")
    }

    #[test]
    fn bare_hosts_get_https() {
        assert_eq!(host_url("idx-abc.svc.pinecone.io"), "https://idx-abc.svc.pinecone.io");
        assert_eq!(host_url("http://127.0.0.1:9000/"), "http://127.0.0.1:9000");
    }

    #[tokio::test]
    async fn lists_index_names() -> Result<(), ServiceError> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes"))
            .and(header("Api-Key", "pc-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "indexes": [{"name": "elective-genie"}, {"name": "other"}]
            })))
            .mount(&server)
            .await;

        let names = control(&server).list_index_names().await?;
        assert_eq!(names, vec!["elective-genie".to_string(), "other".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn describes_readiness_and_host() -> Result<(), ServiceError> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes/elective-genie"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "elective-genie",
                "dimension": 1536,
                "host": "elective-genie-abc.svc.pinecone.io",
                "status": {"ready": false, "state": "Initializing"}
            })))
            .mount(&server)
            .await;

        let description = control(&server).describe_index("elective-genie").await?;
        assert!(!description.ready);
        assert_eq!(description.state, "Initializing");
        assert_eq!(description.dimension, Some(1536));
        assert_eq!(description.host, "elective-genie-abc.svc.pinecone.io");
        Ok(())
    }

    #[tokio::test]
    async fn creates_serverless_cosine_index() -> Result<(), ServiceError> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes"))
            .and(body_partial_json(json!({
                "name": "elective-genie",
                "dimension": 1536,
                "metric": "cosine",
                "spec": {"serverless": {"cloud": "aws", "region": "us-west-2"}}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"name": "elective-genie"})))
            .expect(1)
            .mount(&server)
            .await;

        control(&server).create_index(&IndexSpec::default()).await
    }

    #[tokio::test]
    async fn create_conflict_is_not_an_error() -> Result<(), ServiceError> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        control(&server).create_index(&IndexSpec::default()).await
    }

    #[tokio::test]
    async fn upserts_into_namespace_with_text_metadata() -> Result<(), ServiceError> {
        let server = MockServer::start().await;
        let chunk = make_chunk(Some("a.docx"), 0, "Consensus protocols".to_string());

        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .and(body_partial_json(json!({
                "namespace": "electives",
                "vectors": [{
                    "id": chunk.chunk_id,
                    "values": [0.5, 0.5],
                    "metadata": {"text": "Consensus protocols", "source": "a.docx", "chunk_index": 0}
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let index = control(&server).index(&server.uri());
        index
            .upsert_chunks("electives", &[chunk], &[vec![0.5, 0.5]])
            .await
    }

    #[test]
    fn upsert_values_keep_single_precision() -> Result<(), serde_json::Error> {
        let chunks = vec![make_chunk(None, 0, "text".to_string())];
        let body = serde_json::to_string(&upsert_request("", &chunks, &[vec![0.1, -0.25]]))?;
        assert!(body.contains(r#""values":[0.1,-0.25]"#), "{body}");
        Ok(())
    }

    #[test]
    fn full_upsert_batch_stays_under_request_limit() -> Result<(), serde_json::Error> {
        const REQUEST_LIMIT_BYTES: usize = 2 * 1024 * 1024;
        let dimension = 1536;
        let norm = (dimension as f32).sqrt();

        let chunks = (0..UPSERT_BATCH_SIZE)
            .map(|index| make_chunk(Some("docs/syllabus.docx"), index as u64, "é".repeat(1000)))
            .collect::<Vec<_>>();
        let embeddings = (0..UPSERT_BATCH_SIZE)
            .map(|row| {
                (0..dimension)
                    .map(|column| ((row * dimension + column) as f32 * 0.618_034).sin() / norm)
                    .collect::<Vec<f32>>()
            })
            .collect::<Vec<_>>();

        let body = serde_json::to_vec(&upsert_request("electives", &chunks, &embeddings))?;
        assert!(
            body.len() < REQUEST_LIMIT_BYTES,
            "upsert body is {} bytes",
            body.len()
        );
        Ok(())
    }

    #[tokio::test]
    async fn mismatched_embeddings_are_rejected_before_sending() {
        let index = PineconeClient::new("pc-test").index("http://127.0.0.1:9");
        let chunk = make_chunk(None, 0, "text".to_string());
        let result = index.upsert_chunks("", &[chunk], &[]).await;
        assert!(matches!(result, Err(ServiceError::Request(_))));
    }

    #[tokio::test]
    async fn query_returns_matches_in_store_order() -> Result<(), ServiceError> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .and(body_partial_json(json!({"topK": 2, "includeMetadata": true, "namespace": ""})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "matches": [
                    {"id": "b", "score": 0.91, "metadata": {"text": "Blockchain", "source": "b.docx"}},
                    {"id": "a", "score": 0.72, "metadata": {"text": "Ledgers"}},
                ]
            })))
            .mount(&server)
            .await;

        let hits = control(&server)
            .index(&server.uri())
            .query("", &[0.1, 0.2], 2)
            .await?;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "b");
        assert_eq!(hits[0].source.as_deref(), Some("b.docx"));
        assert_eq!(hits[1].text, "Ledgers");
        assert_eq!(hits[1].source, None);
        Ok(())
    }

    #[tokio::test]
    async fn namespace_count_reads_index_stats() -> Result<(), ServiceError> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/describe_index_stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "namespaces": {"electives": {"vectorCount": 42}},
                "totalVectorCount": 42
            })))
            .mount(&server)
            .await;

        let index = control(&server).index(&server.uri());
        assert_eq!(index.namespace_vector_count("electives").await?, 42);
        assert_eq!(index.namespace_vector_count("missing").await?, 0);
        Ok(())
    }
}
