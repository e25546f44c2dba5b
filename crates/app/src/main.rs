mod config;
mod pipeline;
mod server;

use chrono::Utc;
use clap::Parser;
use config::{Cli, Command};
use pipeline::{run_ingestion, Services};
use server::AppState;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    // A missing .env is fine; the keys may already be in the environment.
    let dotenv_loaded = dotenv::from_path(".env").is_ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let services = Services::from_cli(&cli)?;

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        dotenv_loaded,
        index = %cli.index_name,
        "elective-genie boot"
    );

    match &cli.command {
        Command::Ingest { source } => {
            let ingest_source = source
                .source()
                .ok_or_else(|| anyhow::anyhow!("pass --docs-dir or --documents-file"))?;
            run_ingestion(
                &cli,
                &services,
                &ingest_source,
                &source.options(),
                source.reindex,
                &mut std::io::stdout(),
            )
            .await?;
        }
        Command::Serve { source, bind } => {
            let description = match source.source() {
                Some(ingest_source) => {
                    run_ingestion(
                        &cli,
                        &services,
                        &ingest_source,
                        &source.options(),
                        source.reindex,
                        &mut std::io::stdout(),
                    )
                    .await?
                }
                None => services.index_manager(&cli).ensure_ready().await?,
            };

            let answerer = services.answerer(&cli, &description);
            server::serve(*bind, AppState::new(Arc::new(answerer))).await?;
        }
        Command::Ask { question } => {
            let description = services.index_manager(&cli).ensure_ready().await?;
            let answer = services.answerer(&cli, &description).answer(question, &[]).await?;

            println!("question: {question}");
            println!("answer: {}", answer.text);
            for hit in answer.sources {
                println!("[{:.4}] id={}", hit.score, hit.id);
                if let Some(source) = &hit.source {
                    println!("  source={source}");
                }
                println!("  chunk_text:\n{}", hit.text);
            }
        }
    }

    Ok(())
}
