//! `docuroute ask` — single-question or interactive mode.

use docuroute_agent::{
    AgentController, AgentRun, AgentStreamEvent, LlmAnswerSynthesizer, LlmToolSelector,
    StandaloneQuestionRewriter, StepBudget,
};
use docuroute_config::AppConfig;
use docuroute_core::event::EventBus;
use docuroute_core::message::ChatExchange;
use docuroute_core::provider::Provider;
use docuroute_core::tool::ToolRegistry;
use docuroute_tools::{DocsetRetrievalTool, HumanInterventionTool, RagAnswerer};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tracing::debug;
use tokio_util::sync::CancellationToken;

use super::setup::{build_retriever, load_config, require_provider, CliResult};

pub async fn run(docset_path: &Path, message: Option<String>) -> CliResult<()> {
    let config = load_config()?;
    let provider = require_provider(&config)?;
    let event_bus = Arc::new(EventBus::default());

    let (docset, retriever) =
        build_retriever(&config, docset_path, Some(provider.clone()), event_bus.clone()).await?;

    let mut retrieval_tool =
        DocsetRetrievalTool::new(&docset.name, &docset.description, Arc::new(retriever));
    if config.tools.rag_answers {
        retrieval_tool = retrieval_tool.with_answerer(
            RagAnswerer::new(provider.clone(), &config.default_model)
                .with_temperature(config.default_temperature)
                .with_max_tokens(config.default_max_tokens),
        );
    }

    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(retrieval_tool));
    tools.register(Arc::new(HumanInterventionTool::new()));
    let tool_names = tools.names_listing();

    let event_log = log_events(&event_bus);
    let controller = build_controller(&config, provider, Arc::new(tools), &docset.name)
        .with_event_bus(event_bus);

    match message {
        Some(question) => {
            let run = ask_once(&controller, &question, vec![]).await?;
            print_run(&run);
        }
        None => {
            println!();
            println!("  ╔══════════════════════════════════════════════╗");
            println!("  ║         docuroute — Interactive Mode         ║");
            println!("  ╚══════════════════════════════════════════════╝");
            println!();
            println!("  Docset:    {} ({} chunks)", docset.name, docset.chunks.len());
            println!("  Provider:  {}", config.default_provider);
            println!("  Model:     {}", config.default_model);
            println!("  Tools:     {tool_names}");
            println!("  Budget:    {} steps, {}s", config.agent.max_steps, config.agent.max_duration_secs);
            println!();
            println!("  Type your question and press Enter.");
            println!("  Type 'exit' or Ctrl+D to quit.");
            println!();

            interactive(&controller).await?;

            println!();
            println!("  Goodbye!");
            println!();
        }
    }

    event_log.abort();
    Ok(())
}

/// Mirror domain events into the debug log (`-v` to see them).
fn log_events(bus: &EventBus) -> tokio::task::JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => debug!(kind = event.kind(), event = ?event, "Domain event"),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Event log fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn build_controller(
    config: &AppConfig,
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    label: &str,
) -> AgentController {
    let model = config.default_model.as_str();
    let selector = LlmToolSelector::new(provider.clone(), model)
        .with_temperature(config.default_temperature)
        .with_max_tokens(config.default_max_tokens)
        .with_max_parse_retries(config.agent.max_parse_retries);
    let synthesizer = LlmAnswerSynthesizer::new(provider.clone(), model)
        .with_label(label)
        .with_temperature(config.default_temperature)
        .with_max_tokens(config.default_max_tokens)
        .with_max_parse_retries(config.agent.max_parse_retries);

    AgentController::new(
        Arc::new(selector),
        Arc::new(synthesizer),
        tools,
        StepBudget::from(&config.agent),
    )
    .with_rewriter(StandaloneQuestionRewriter::new(provider, model))
}

/// Run one question, printing progress to stderr. Ctrl+C cancels the run.
async fn ask_once(
    controller: &AgentController,
    question: &str,
    history: Vec<ChatExchange>,
) -> CliResult<AgentRun> {
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let (tx, mut rx) = mpsc::channel(32);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                AgentStreamEvent::Progress { answer } => eprintln!("  ... {}", answer.answer),
                AgentStreamEvent::Error { message } => eprintln!("  [Error] {message}"),
                _ => {}
            }
        }
    });

    let run = controller.run_with(question, history, cancel, Some(tx)).await;
    ctrl_c.abort();
    // The sender is gone once run_with returns, so the printer drains and exits.
    let _ = printer.await;
    Ok(run?)
}

async fn interactive(controller: &AgentController) -> CliResult<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut history: Vec<ChatExchange> = Vec::new();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        match ask_once(controller, question, history.clone()).await {
            Ok(run) => {
                print_run(&run);
                history.push(ChatExchange::new(question, run.answer.answer.clone()));
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }
    Ok(())
}

fn print_run(run: &AgentRun) {
    println!();
    if run.answer.answer.trim().is_empty() {
        println!("  Assistant > I could not reach an answer ({}).", run.termination);
    } else {
        for line in run.answer.answer.lines() {
            println!("  Assistant > {line}");
        }
    }

    if !run.answer.citations.is_empty() {
        println!();
        println!("  Sources:");
        for (i, citation) in run.answer.citations.iter().enumerate() {
            let mut line = format!("    [{}] {}", i + 1, citation.label);
            if !citation.details.is_empty() {
                line.push_str(&format!(" — {}", citation.details));
            }
            if !citation.link.is_empty() {
                line.push_str(&format!(" <{}>", citation.link));
            }
            println!("{line}");
        }
    }

    if !run.termination.is_final() {
        println!();
        println!(
            "  (best effort after {} step(s): {})",
            run.steps.len(),
            run.termination
        );
    }
    println!();
}
