use clap::{Args, Parser, Subcommand};
use elective_genie_core::stores::pinecone::DEFAULT_CONTROL_PLANE_URL;
use elective_genie_core::{
    AnswerMode, IndexSpec, IngestSource, IngestionOptions, DEFAULT_CHAT_MODEL, DEFAULT_DELIMITER,
    DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL, DEFAULT_INDEX_NAME,
    DEFAULT_OPENAI_BASE_URL, DEFAULT_TOP_K,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::warn;

const FALLBACK_REGION: &str = "us-west-2";

#[derive(Parser)]
#[command(name = "elective-genie", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: String,

    /// Pinecone API key
    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    pub pinecone_api_key: String,

    /// Serverless region used when the index has to be created. Legacy pod
    /// environments such as gcp-starter fall back to us-west-2.
    #[arg(long, env = "PINECONE_ENV", default_value = FALLBACK_REGION)]
    pub pinecone_region: String,

    /// Serverless cloud used when the index has to be created
    #[arg(long, default_value = "aws")]
    pub pinecone_cloud: String,

    /// Pinecone control-plane URL
    #[arg(long, default_value = DEFAULT_CONTROL_PLANE_URL)]
    pub pinecone_url: String,

    /// Pinecone index name
    #[arg(long, default_value = DEFAULT_INDEX_NAME)]
    pub index_name: String,

    /// Namespace inside the index; empty means the default namespace
    #[arg(long, default_value = "")]
    pub namespace: String,

    /// OpenAI-compatible API base URL
    #[arg(long, default_value = DEFAULT_OPENAI_BASE_URL)]
    pub openai_base_url: String,

    #[arg(long, default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    /// Must match the dimension of the index
    #[arg(long, default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    pub embedding_dimensions: usize,

    #[arg(long, default_value = DEFAULT_CHAT_MODEL)]
    pub chat_model: String,

    /// How retrieved context is presented to the chat model: stuff or persona
    #[arg(long, default_value = "stuff")]
    pub answer_mode: AnswerMode,

    /// Number of chunks retrieved per question
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load documents, estimate embedding cost and upsert them into the index.
    Ingest {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Optionally ingest, then serve POST /api/ask.
    Serve {
        #[command(flatten)]
        source: SourceArgs,

        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:5000")]
        bind: SocketAddr,
    },
    /// Answer one question from the command line.
    Ask {
        #[arg(long)]
        question: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Directory containing only .docx files
    #[arg(long, conflicts_with = "documents_file")]
    pub docs_dir: Option<PathBuf>,

    /// Single text file with chunks separated by --delimiter
    #[arg(long)]
    pub documents_file: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_DELIMITER)]
    pub delimiter: String,

    /// Maximum chunk size in characters
    #[arg(long, default_value_t = 1_000)]
    pub chunk_size: usize,

    /// Characters shared by adjacent chunks
    #[arg(long, default_value_t = 100)]
    pub chunk_overlap: usize,

    /// Upsert even if the namespace already holds vectors
    #[arg(long, default_value_t = false)]
    pub reindex: bool,
}

impl SourceArgs {
    pub fn source(&self) -> Option<IngestSource> {
        match (&self.docs_dir, &self.documents_file) {
            (Some(dir), _) => Some(IngestSource::DocxDirectory(dir.clone())),
            (None, Some(file)) => Some(IngestSource::DelimitedFile(file.clone())),
            (None, None) => None,
        }
    }

    pub fn options(&self) -> IngestionOptions {
        IngestionOptions {
            chunk_max_chars: self.chunk_size,
            chunk_overlap_chars: self.chunk_overlap,
            delimiter: self.delimiter.clone(),
        }
    }
}

impl Cli {
    pub fn index_spec(&self) -> IndexSpec {
        IndexSpec {
            name: self.index_name.clone(),
            dimension: self.embedding_dimensions,
            cloud: self.pinecone_cloud.clone(),
            region: self.serverless_region(),
            ..IndexSpec::default()
        }
    }

    fn serverless_region(&self) -> String {
        let region = self.pinecone_region.trim();
        if is_pod_environment(region) {
            warn!(
                environment = region,
                fallback = FALLBACK_REGION,
                "PINECONE_ENV names a pod environment, not a serverless region"
            );
            return FALLBACK_REGION.to_string();
        }
        region.to_string()
    }
}

// Pod-based environments look like `gcp-starter`, `us-west1-gcp` or
// `us-east-1-aws`; serverless regions carry no cloud suffix.
fn is_pod_environment(value: &str) -> bool {
    value.is_empty()
        || value.contains("starter")
        || ["-gcp", "-aws", "-azure", "-free"]
            .iter()
            .any(|suffix| value.ends_with(suffix) || value.contains(&format!("{suffix}-")))
}
