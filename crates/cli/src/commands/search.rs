//! `docuroute search` — inspect fused retrieval output for a query.

use docuroute_config::EmbeddingKind;
use docuroute_core::event::EventBus;
use docuroute_core::retrieval::{ResolvedDocument, Resolution};
use std::path::Path;
use std::sync::Arc;

use super::setup::{build_retriever, load_config, require_provider, CliResult};

pub async fn run(docset_path: &Path, query: &str, k: Option<usize>) -> CliResult<()> {
    let config = load_config()?;
    // Hash embeddings run offline; only provider embeddings need a key.
    let provider = match config.retrieval.embedding {
        EmbeddingKind::Hash => None,
        EmbeddingKind::Provider => Some(require_provider(&config)?),
    };

    let (docset, retriever) =
        build_retriever(&config, docset_path, provider, Arc::new(EventBus::default())).await?;
    let k = k.unwrap_or(config.retrieval.k);
    let documents = retriever.retrieve_k(query, k).await?;

    println!();
    println!("  {} result(s) from '{}' for \"{query}\"", documents.len(), docset.name);
    println!();
    for (i, doc) in documents.iter().enumerate() {
        println!("{}", format_document(i + 1, doc));
        println!();
    }
    Ok(())
}

fn resolution_label(resolution: &Resolution) -> &'static str {
    match resolution {
        Resolution::Summary => "summary",
        Resolution::Parent => "parent",
        Resolution::Chunk => "chunk",
    }
}

fn format_document(rank: usize, doc: &ResolvedDocument) -> String {
    let mut out = format!(
        "  [{rank}] {} ({}, via chunk {}, score {:.3})",
        doc.source_id,
        resolution_label(&doc.resolution),
        doc.chunk_id,
        doc.score
    );
    for line in doc.text.lines() {
        out.push_str("\n      ");
        out.push_str(line);
    }
    out
}
