use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vellum::cli::output::Output;
use vellum::cli::{Cli, Commands};
use vellum::config::Config;
use vellum::llm::LlmClientFactory;
use vellum::rag::embeddings::embedder_from_config;
use vellum::rag::{CachedEmbedder, LruEmbeddingCache, RagPipeline, TextChunker};
use vellum::store::VectorStoreProvider;
use vellum::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    if let Some(ref path) = cli.config {
        dotenvy::from_path(path)
            .with_context(|| format!("Failed to load env file {}", path.display()))?;
    }

    init_tracing(cli.verbose);

    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let config = Config::from_env()?;
    let state = build_state(&config).await?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(state, &output).await,
        Commands::Ingest { path, collection } => {
            let collection = collection.unwrap_or_else(|| config.rag.collection.clone());
            ingest(state, &output, &path, &collection).await
        }
        Commands::Query {
            question,
            collection,
            top_k,
        } => {
            let collection = collection.unwrap_or_else(|| config.rag.collection.clone());
            query(state, &output, &question, &collection, top_k).await
        }
        Commands::Collections => collections(state, &output).await,
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "vellum=debug,info" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let store = VectorStoreProvider::from_env()
        .create_store()
        .await
        .context("Failed to initialize vector store")?;

    let embedder = embedder_from_config(&config.providers)
        .context("Failed to initialize embedding provider")?;
    let cache = Arc::new(LruEmbeddingCache::with_defaults());
    let embedder = Arc::new(CachedEmbedder::new(embedder, cache));

    let llm_factory = LlmClientFactory::from_config(&config.providers)
        .context("Failed to configure LLM provider")?;
    let llm = llm_factory
        .create_default()
        .await
        .context("Failed to create LLM client")?;

    let chunker = TextChunker::with_word_chunking(config.rag.chunk_size, config.rag.chunk_overlap)?;

    let pipeline = RagPipeline::new(chunker, embedder, Arc::from(store), Arc::from(llm))
        .with_top_k(config.rag.top_k)
        .with_threshold(config.rag.score_threshold);

    Ok(AppState {
        pipeline: Arc::new(pipeline),
        config: Arc::new(config.clone()),
    })
}

async fn serve(state: AppState, output: &Output) -> anyhow::Result<()> {
    let addr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    );

    output.banner();
    output.info(&format!("listening on http://{}", addr));
    output.detail("store", state.pipeline.store().provider_name());
    output.detail("embeddings", state.pipeline.embedder().model_name());

    let router = vellum::api::create_router().with_state(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(%addr, "server started");
    axum::serve(listener, router).await.context("Server error")?;

    Ok(())
}

async fn ingest(
    state: AppState,
    output: &Output,
    path: &std::path::Path,
    collection: &str,
) -> anyhow::Result<()> {
    output.info(&format!(
        "ingesting {} into '{}'",
        path.display(),
        collection
    ));

    let report = state.pipeline.ingest_directory(path, collection).await?;

    output.success(&format!(
        "ingested {} documents ({} chunks)",
        report.documents_loaded, report.chunks_created
    ));

    for (file, reason) in &report.skipped {
        output.warning(&format!("skipped {}: {}", file, reason));
    }

    Ok(())
}

async fn query(
    state: AppState,
    output: &Output,
    question: &str,
    collection: &str,
    top_k: Option<usize>,
) -> anyhow::Result<()> {
    let top_k = top_k.unwrap_or(state.config.rag.top_k);
    let answer = state
        .pipeline
        .answer_with(question, collection, top_k, state.config.rag.score_threshold)
        .await?;

    output.heading(&answer.answer);

    if !answer.sources.is_empty() {
        output.info("sources:");
        for source in &answer.sources {
            output.detail(
                &format!("{:.3}", source.score),
                if source.title.is_empty() {
                    &source.source
                } else {
                    &source.title
                },
            );
        }
    }

    Ok(())
}

async fn collections(state: AppState, output: &Output) -> anyhow::Result<()> {
    let collections = state.pipeline.store().list_collections().await?;

    if collections.is_empty() {
        output.info("no collections");
        return Ok(());
    }

    for info in collections {
        output.detail(
            &info.name,
            &format!("{} documents, {} dims", info.document_count, info.dimensions),
        );
    }

    Ok(())
}
