//! Wiring shared by `ask` and `search`: docset → index, stores, retriever.

use docuroute_config::{AppConfig, EmbeddingKind, StoreBackend};
use docuroute_core::event::EventBus;
use docuroute_core::provider::Provider;
use docuroute_core::retrieval::DocumentStore;
use docuroute_retrieval::{
    Docset, Embedder, FusedSummaryRetriever, ProviderEmbedder, RetrieverConfig, SqliteDocumentStore,
    TermOverlapReranker, TokenHashEmbedder,
};
use docuroute_tools::slugify;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

pub fn load_config() -> CliResult<AppConfig> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// The configured default provider. Fails with setup instructions when no API key is set.
pub fn require_provider(config: &AppConfig) -> CliResult<Arc<dyn Provider>> {
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    DOCUROUTE_API_KEY    (generic)");
        eprintln!("    OPENROUTER_API_KEY   (recommended)");
        eprintln!("    OPENAI_API_KEY       (for OpenAI direct)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let router = docuroute_providers::build_from_config(config);
    Ok(router.default().ok_or("No default provider configured")?)
}

fn embedder(config: &AppConfig, provider: Option<Arc<dyn Provider>>) -> CliResult<Arc<dyn Embedder>> {
    match config.retrieval.embedding {
        EmbeddingKind::Hash => Ok(Arc::new(TokenHashEmbedder::new(
            config.retrieval.embedding_dimensions,
        ))),
        EmbeddingKind::Provider => {
            let provider = provider.ok_or("retrieval.embedding = \"provider\" needs an API key")?;
            Ok(Arc::new(ProviderEmbedder::new(
                provider,
                config.retrieval.embedding_model.clone(),
            )))
        }
    }
}

async fn stores(
    config: &AppConfig,
    docset: &Docset,
) -> CliResult<(Arc<dyn DocumentStore>, Arc<dyn DocumentStore>)> {
    match config.store.backend {
        StoreBackend::Memory => Ok((Arc::new(docset.summary_store()), Arc::new(docset.parent_store()))),
        StoreBackend::Sqlite => {
            let path = config.store.sqlite_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let pool = SqliteDocumentStore::open_pool(&path.to_string_lossy()).await?;
            let slug = slugify(&docset.name);
            let summaries = SqliteDocumentStore::from_pool(pool.clone(), &format!("summaries_{slug}")).await?;
            let parents = SqliteDocumentStore::from_pool(pool, &format!("parents_{slug}")).await?;
            docset.persist(&summaries, &parents).await?;
            Ok((Arc::new(summaries), Arc::new(parents)))
        }
    }
}

/// Load a docset and build its fused retriever from configuration.
pub async fn build_retriever(
    config: &AppConfig,
    docset_path: &Path,
    provider: Option<Arc<dyn Provider>>,
    event_bus: Arc<EventBus>,
) -> CliResult<(Docset, FusedSummaryRetriever)> {
    let docset = Docset::load(docset_path).await?;
    let index = docset.build_index(embedder(config, provider)?).await?;
    let (summaries, parents) = stores(config, &docset).await?;

    let retrieval = &config.retrieval;
    let mut retriever = FusedSummaryRetriever::new(
        Arc::new(index),
        RetrieverConfig::default()
            .with_k(retrieval.k)
            .with_overfetch_factor(retrieval.overfetch_factor)
            .with_search_mode(retrieval.search_mode()),
    )
    .with_summary_store(summaries)
    .with_parent_store(parents)
    .with_event_bus(event_bus);

    if retrieval.rerank {
        retriever = retriever.with_reranker(Arc::new(TermOverlapReranker::new()));
    }

    info!(
        docset = %docset.name,
        k = retrieval.k,
        overfetch = retrieval.overfetch_factor,
        rerank = retrieval.rerank,
        "Retriever ready"
    );
    Ok((docset, retriever))
}
