//! Ingestion server binary
//!
//! Run with: cargo run -p docvec-ingest --bin docvec-ingest-server

use docvec_ingest::{config::IngestConfig, server::IngestServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docvec_ingest=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let mut config = match std::env::var("DOCVEC_CONFIG") {
        Ok(path) => {
            tracing::info!("Loading configuration from {}", path);
            IngestConfig::from_file(&path)?
        }
        Err(_) => {
            tracing::info!("DOCVEC_CONFIG not set, using defaults");
            IngestConfig::default()
        }
    };

    // Credentials are read once here and handed down explicitly.
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        config.embeddings.api_key = Some(key);
    }
    if let Ok(key) = std::env::var("PINECONE_API_KEY") {
        config.index.api_key = Some(key);
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - Embedding dimensions: {}", config.embeddings.dimensions);
    tracing::info!("  - Index backend: {:?} ({})", config.index.backend, config.index.index_name);
    tracing::info!("  - Breakpoint threshold: {:?}", config.chunking.threshold);

    let server = IngestServer::new(config)?;

    println!("\nServer starting...");
    println!("  Liveness: http://{}/", server.address());
    println!("  Health:   http://{}/health", server.address());
    println!("  Ingest:   POST http://{}/process-file/", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
