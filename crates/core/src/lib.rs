pub mod answerer;
pub mod chunking;
pub mod cost;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod history;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod openai;
pub mod retriever;
pub mod stores;
pub mod traits;

pub use answerer::{Answer, AnswerMode, Answerer, SYSTEM_PERSONA};
pub use chunking::{build_chunks, split_text, ChunkingConfig};
pub use cost::{
    cost_for_tokens, default_tokenizer, estimate_embedding_cost, EmbeddingCost, TokenCounter,
};
pub use embeddings::{OpenAiEmbedder, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL};
pub use error::{IngestError, ServiceError};
pub use extractor::{extract_docx_text, DocumentExtractor, DocxExtractor, LoadedDocument};
pub use history::{ChatHistoryStore, DEFAULT_SESSION};
pub use index::{populate_namespace, IndexManager, PopulateReport};
pub use ingest::{discover_docx_files, load_chunks, load_delimited_file, load_docx_directory, IngestSource};
pub use llm::{OpenAiChat, DEFAULT_CHAT_MODEL};
pub use models::{
    ChatMessage, ChatRole, ChatTurn, DistanceMetric, DocumentChunk, IndexDescription, IndexSpec,
    IngestionOptions, SearchHit, DEFAULT_DELIMITER, DEFAULT_INDEX_NAME,
};
pub use openai::{OpenAiClient, DEFAULT_OPENAI_BASE_URL};
pub use retriever::{Retriever, DEFAULT_TOP_K};
pub use stores::{PineconeClient, PineconeIndex};
pub use traits::{ChatModel, Embedder, IndexAdmin, QuestionAnswerer, VectorIndex};
