use crate::config::Cli;
use anyhow::Context;
use elective_genie_core::{
    default_tokenizer, estimate_embedding_cost, load_chunks, populate_namespace, Answerer,
    Embedder, IndexDescription, IndexManager, IngestSource, IngestionOptions, OpenAiChat,
    OpenAiClient, OpenAiEmbedder, PineconeClient, PineconeIndex, Retriever,
};
use std::io::Write;
use tracing::{info, warn};

pub type PineconeAnswerer = Answerer<OpenAiEmbedder, PineconeIndex, OpenAiChat>;

/// Remote clients built once from the command line.
pub struct Services {
    pub openai: OpenAiClient,
    pub pinecone: PineconeClient,
    pub embedder: OpenAiEmbedder,
}

impl Services {
    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let openai = OpenAiClient::new(&cli.openai_api_key)
            .with_base_url(&cli.openai_base_url)
            .context("invalid --openai-base-url")?;
        let pinecone = PineconeClient::new(&cli.pinecone_api_key)
            .with_endpoint(&cli.pinecone_url)
            .context("invalid --pinecone-url")?;
        let embedder = OpenAiEmbedder::new(openai.clone(), &cli.embedding_model)
            .with_dimensions(cli.embedding_dimensions);

        Ok(Self {
            openai,
            pinecone,
            embedder,
        })
    }

    pub fn index_manager(&self, cli: &Cli) -> IndexManager<PineconeClient> {
        IndexManager::new(self.pinecone.clone(), cli.index_spec())
    }

    pub fn answerer(&self, cli: &Cli, description: &IndexDescription) -> PineconeAnswerer {
        let retriever = Retriever::new(
            self.embedder.clone(),
            self.pinecone.index(&description.host),
            cli.namespace.clone(),
        );
        let chat = OpenAiChat::new(self.openai.clone(), &cli.chat_model);

        Answerer::new(retriever, chat)
            .with_mode(cli.answer_mode)
            .with_top_k(cli.top_k)
    }
}

/// Loader, chunker, cost estimate, then index population. Progress lines go
/// to `out`; the ready index is returned so the caller can query it.
pub async fn run_ingestion<W: Write>(
    cli: &Cli,
    services: &Services,
    source: &IngestSource,
    options: &IngestionOptions,
    reindex: bool,
    out: &mut W,
) -> anyhow::Result<IndexDescription> {
    let chunks = load_chunks(source, options).context("document loading failed")?;
    info!(source = ?source, chunk_count = chunks.len(), "loaded chunks");

    match default_tokenizer() {
        Ok(tokenizer) => {
            let cost = estimate_embedding_cost(&tokenizer, &chunks);
            writeln!(out, "Token Amount: {}", cost.total_tokens)?;
            writeln!(out, "Embedding Cost in USD:{:.6}", cost.usd)?;
        }
        Err(error) => warn!(%error, "skipping embedding cost estimate"),
    }

    let description = services.index_manager(cli).ensure_ready().await?;
    let index = services.pinecone.index(&description.host);

    info!(
        index = %description.name,
        namespace = %cli.namespace,
        model = %services.embedder.model(),
        dimensions = services.embedder.dimensions(),
        "populating namespace"
    );
    let report = populate_namespace(&services.embedder, &index, &cli.namespace, &chunks, reindex)
        .await
        .context("index population failed")?;

    match report.already_populated {
        Some(existing) => writeln!(
            out,
            "namespace already holds {existing} vectors; pass --reindex to upsert again"
        )?,
        None => writeln!(out, "{} chunks upserted into {}", report.upserted, description.name)?,
    }

    Ok(description)
}
