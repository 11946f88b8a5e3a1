//! End-to-end integration tests for docuroute.
//!
//! These exercise the full pipeline from a docset and a question to a cited
//! answer: fused retrieval, the docset tool, and the tool-routing controller
//! driven by a scripted LLM.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use docuroute_agent::{
    AgentController, AgentStreamEvent, LlmAnswerSynthesizer, LlmToolSelector, Phase, StepBudget,
    Termination,
};
use docuroute_core::error::{ProviderError, RetrievalError};
use docuroute_core::event::{DomainEvent, EventBus};
use docuroute_core::message::Message;
use docuroute_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use docuroute_core::retrieval::{ChunkIndex, ChunkRecord, Resolution, SearchMode};
use docuroute_core::tool::ToolRegistry;
use docuroute_retrieval::{
    Docset, FusedSummaryRetriever, InMemoryDocumentStore, RetrieverConfig, TermOverlapReranker,
    TokenHashEmbedder,
};
use docuroute_tools::{DocsetRetrievalTool, HumanInterventionTool};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const LEASE_A_SUMMARY: &str =
    "Lease A between Acme Corp and Main Street LLC runs from April 1, 2020 and terminates on March 31, 2025.";

const LEASES_JSON: &str = r#"{
    "name": "Leases",
    "description": "Commercial lease agreements.",
    "chunks": [
        {"id": "a1", "text": "The termination date of this lease is March 31, 2025.", "parent_id": "doc-a", "summary_id": "doc-a"},
        {"id": "a2", "text": "Tenant may terminate early with 90 days notice before the termination date.", "parent_id": "doc-a"},
        {"id": "a3", "text": "Rent for Acme Corp is payable monthly.", "parent_id": "doc-a"},
        {"id": "b1", "text": "Lease B rent escalates 3% each year.", "parent_id": "doc-b"},
        {"id": "b2", "text": "Lease B has a termination date of June 1, 2026.", "parent_id": "doc-b"}
    ],
    "summaries": {
        "doc-a": "Lease A between Acme Corp and Main Street LLC runs from April 1, 2020 and terminates on March 31, 2025."
    },
    "parents": {
        "doc-a": "Full text of lease A.",
        "doc-b": "Full text of lease B."
    }
}"#;

// ── Scripted collaborators ──────────────────────────────────────────────

/// A mock provider that returns scripted responses in sequence.
struct ScriptedProvider {
    responses: Vec<String>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: &[&str]) -> Self {
        Self {
            responses: responses.iter().map(|r| r.to_string()).collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> ProviderRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let call = requests.len();
        requests.push(request);
        let text = self
            .responses
            .get(call)
            .unwrap_or_else(|| panic!("ScriptedProvider: no response for call #{call}"));
        Ok(ProviderResponse {
            message: Message::assistant(text.clone()),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock-model".into(),
        })
    }
}

/// Returns fixed chunks regardless of the query.
struct FixedIndex(Vec<ChunkRecord>);

#[async_trait]
impl ChunkIndex for FixedIndex {
    async fn search(&self, _query: &str, k: usize, _mode: SearchMode) -> Result<Vec<ChunkRecord>, RetrievalError> {
        Ok(self.0.iter().take(k).cloned().collect())
    }
}

fn summary_store() -> Arc<InMemoryDocumentStore> {
    Arc::new(InMemoryDocumentStore::from_map(
        "summaries",
        HashMap::from([("doc-a".to_string(), LEASE_A_SUMMARY.to_string())]),
    ))
}

fn parent_store() -> Arc<InMemoryDocumentStore> {
    Arc::new(InMemoryDocumentStore::from_map(
        "parents",
        HashMap::from([
            ("doc-a".to_string(), "Full text of lease A.".to_string()),
            ("doc-b".to_string(), "Full text of lease B.".to_string()),
        ]),
    ))
}

// ── Retrieval ───────────────────────────────────────────────────────────

#[tokio::test]
async fn termination_date_fuses_to_two_documents() {
    // Three chunks of document A (one with a summary) and two of document B,
    // interleaved the way a vector search might return them.
    let index = FixedIndex(vec![
        ChunkRecord::new("a1", "The termination date is March 31, 2025.")
            .with_score(0.95)
            .with_parent("doc-a")
            .with_summary("doc-a"),
        ChunkRecord::new("b1", "Lease B terminates June 1, 2026.")
            .with_score(0.90)
            .with_parent("doc-b"),
        ChunkRecord::new("a2", "Early termination requires notice.")
            .with_score(0.85)
            .with_parent("doc-a"),
        ChunkRecord::new("b2", "Lease B renewal terms.")
            .with_score(0.80)
            .with_parent("doc-b"),
        ChunkRecord::new("a3", "Termination fees apply.")
            .with_score(0.75)
            .with_parent("doc-a"),
    ]);

    let retriever = FusedSummaryRetriever::new(Arc::new(index), RetrieverConfig::default().with_k(4))
        .with_summary_store(summary_store())
        .with_parent_store(parent_store());

    let docs = retriever.retrieve("What is the termination date?").await.unwrap();

    assert!(docs.len() <= 2);
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].source_id, "doc-a");
    assert_eq!(docs[0].text, LEASE_A_SUMMARY);
    assert_eq!(docs[0].resolution, Resolution::Summary);
    assert_eq!(docs[1].source_id, "doc-b");
    assert_eq!(docs[1].resolution, Resolution::Parent);
    assert!(docs.iter().any(|d| d.text == LEASE_A_SUMMARY));
}

#[tokio::test]
async fn docset_pipeline_with_reranker_puts_summary_first() {
    let docset = Docset::from_json(LEASES_JSON).unwrap();
    let index = docset.build_index(Arc::new(TokenHashEmbedder::default())).await.unwrap();
    let bus = Arc::new(EventBus::default());
    let mut events = bus.subscribe();

    let retriever = FusedSummaryRetriever::new(Arc::new(index), RetrieverConfig::default().with_k(4))
        .with_summary_store(Arc::new(docset.summary_store()))
        .with_parent_store(Arc::new(docset.parent_store()))
        .with_reranker(Arc::new(TermOverlapReranker::new()))
        .with_event_bus(bus);

    let docs = retriever.retrieve("What is the termination date?").await.unwrap();

    assert!(!docs.is_empty() && docs.len() <= 2);
    assert_eq!(docs[0].text, LEASE_A_SUMMARY);
    let ids: Vec<_> = docs.iter().map(|d| d.source_id.as_str()).collect();
    let mut unique = ids.clone();
    unique.dedup();
    assert_eq!(ids, unique);

    match &*events.try_recv().unwrap() {
        DomainEvent::RetrievalCompleted { candidates, returned, .. } => {
            assert_eq!(*candidates, 5);
            assert_eq!(*returned, docs.len());
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn docset_file_on_disk_drives_search() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("leases.json");
    std::fs::write(&path, LEASES_JSON).unwrap();

    let docset = Docset::load(&path).await.unwrap();
    assert_eq!(docset.name, "Leases");
    assert_eq!(docset.chunks.len(), 5);

    let index = docset.build_index(Arc::new(TokenHashEmbedder::default())).await.unwrap();
    let retriever = FusedSummaryRetriever::new(Arc::new(index), RetrieverConfig::default())
        .with_summary_store(Arc::new(docset.summary_store()))
        .with_parent_store(Arc::new(docset.parent_store()));

    let docs = retriever.retrieve_k("Lease B rent escalation", 1).await.unwrap();
    assert_eq!(docs.len(), 1);
    assert!(retriever.retrieve_k("anything", 0).await.unwrap().is_empty());
}

// ── Agent ───────────────────────────────────────────────────────────────

async fn leases_registry() -> Arc<ToolRegistry> {
    let docset = Docset::from_json(LEASES_JSON).unwrap();
    let index = docset.build_index(Arc::new(TokenHashEmbedder::default())).await.unwrap();
    let retriever = FusedSummaryRetriever::new(Arc::new(index), RetrieverConfig::default().with_k(2))
        .with_summary_store(Arc::new(docset.summary_store()))
        .with_parent_store(Arc::new(docset.parent_store()))
        .with_reranker(Arc::new(TermOverlapReranker::new()));

    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(DocsetRetrievalTool::new(
        &docset.name,
        &docset.description,
        Arc::new(retriever),
    )));
    tools.register(Arc::new(HumanInterventionTool::new()));
    Arc::new(tools)
}

fn agent(provider: Arc<ScriptedProvider>, tools: Arc<ToolRegistry>, max_steps: usize) -> AgentController {
    AgentController::new(
        Arc::new(LlmToolSelector::new(provider.clone(), "mock-model")),
        Arc::new(LlmAnswerSynthesizer::new(provider, "mock-model").with_label("Leases")),
        tools,
        StepBudget::new(max_steps, Duration::from_secs(60)),
    )
}

#[tokio::test]
async fn agent_answers_termination_date_from_summary() {
    let provider = Arc::new(ScriptedProvider::new(&[
        r#"```json
{"tool_name": "retrieval_leases", "tool_input": "What is the termination date?"}
```"#,
        r#"{"answer": "Lease A terminates on March 31, 2025.", "is_final": true,
            "citations": [{"label": "Lease A", "details": "summary", "link": ""}]}"#,
    ]));
    let tools = leases_registry().await;

    let run = agent(provider.clone(), tools, 6)
        .run("What is the termination date?", vec![])
        .await
        .unwrap();

    assert_eq!(run.phase, Phase::Terminal);
    assert!(matches!(run.termination, Termination::Final));
    assert!(run.answer.is_final);
    assert_eq!(run.answer.source, "Leases");
    assert_eq!(run.answer.citations.len(), 1);

    assert_eq!(run.steps.len(), 1);
    let step = &run.steps.as_slice()[0];
    assert_eq!(step.invocation.tool_name, "retrieval_leases");
    assert!(step.output.contains(LEASE_A_SUMMARY));

    assert_eq!(provider.calls(), 2);
    let selection = provider.request(0);
    assert!(selection.messages[0].content.contains("retrieval_leases: Pass the COMPLETE question"));
    assert!(selection.messages[0].content.contains("human_intervention"));
    let synthesis = provider.request(1);
    assert!(synthesis.messages[1].content.contains(LEASE_A_SUMMARY));
}

#[tokio::test]
async fn agent_never_satisfied_stops_at_budget() {
    let selection = r#"{"tool_name": "retrieval_leases", "tool_input": "termination date"}"#;
    let partial = r#"{"answer": "Possibly March 31, 2025.", "is_final": false}"#;
    let provider = Arc::new(ScriptedProvider::new(&[selection, partial, selection, partial]));

    let run = agent(provider.clone(), leases_registry().await, 2)
        .run("What is the termination date?", vec![])
        .await
        .unwrap();

    assert_eq!(run.steps.len(), 2);
    assert!(matches!(run.termination, Termination::StepBudgetExhausted));
    assert!(!run.answer.is_final);
    assert_eq!(run.answer.answer, "Possibly March 31, 2025.");
    assert_eq!(provider.calls(), 4);
}

#[tokio::test]
async fn agent_recovers_from_malformed_selection() {
    let provider = Arc::new(ScriptedProvider::new(&[
        "I would search the leases.",
        r#"{"tool_name": "retrieval_leases", "tool_input": "termination date"}"#,
        r#"{"answer": "March 31, 2025", "is_final": true}"#,
    ]));

    let run = agent(provider.clone(), leases_registry().await, 6)
        .run("What is the termination date?", vec![])
        .await
        .unwrap();

    assert!(run.termination.is_final());
    assert_eq!(run.steps.len(), 1);
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn agent_stream_events_serialize_with_type_tags() {
    let provider = Arc::new(ScriptedProvider::new(&[
        r#"{"tool_name": "retrieval_leases", "tool_input": "termination date"}"#,
        r#"{"answer": "March 31, 2025", "is_final": true}"#,
    ]));
    let (tx, mut rx) = mpsc::channel(16);

    let run = agent(provider, leases_registry().await, 6)
        .run_with("What is the termination date?", vec![], CancellationToken::new(), Some(tx))
        .await
        .unwrap();
    assert!(run.termination.is_final());

    let mut tags = Vec::new();
    while let Ok(event) = rx.try_recv() {
        let json = serde_json::to_value(&event).unwrap();
        if let AgentStreamEvent::Progress { answer } = &event {
            assert_eq!(answer.answer, "Searching documents for 'termination date'");
        }
        tags.push(json["type"].as_str().unwrap().to_string());
    }
    assert_eq!(tags, vec!["progress", "tool_result", "answer", "done"]);
}
