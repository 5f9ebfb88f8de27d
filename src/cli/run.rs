// src/cli/run.rs — `run`, `resume` and `show` commands

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{RunArgs, SessionArgs};
use crate::agents::LlmAgentFactory;
use crate::core::orchestrator::{Orchestrator, ReviewDecision, ReviewGate, RunConfig};
use crate::core::state;
use crate::core::types::{Evaluation, Proposal, ProposalInput, WorkflowState};
use crate::infra::config::Config;
use crate::infra::paths;
use crate::provider::openai_compat::OpenAICompatProvider;
use crate::provider::retry::{RetryPolicy, RetryProvider};
use crate::provider::ModelProvider;
use crate::retrieval::{InMemoryRetriever, Retriever};

/// Start a new run. Returns whether it ended without error or cancellation.
pub async fn run_proposal(args: RunArgs, mut config: Config, quiet: bool) -> anyhow::Result<bool> {
    let input = load_input(&args.input)?;

    if let Some(model) = args.model {
        config.models.model = model;
    }
    if let Some(n) = args.max_iterations {
        config.workflow.max_iterations = n;
    }
    if let Some(score) = args.excellent_score {
        config.workflow.excellent_score = score;
    }
    if args.tolerate_failures {
        config.evaluation.tolerate_failures = true;
    }

    let orchestrator = build_orchestrator(&config, &args.session, quiet)?;
    let cancel = cancel_on_ctrl_c();
    let orchestrator = orchestrator.with_cancellation(cancel);

    // The snapshot path needs the run id, so the state is created up front.
    let state = WorkflowState::new(input);
    let snapshot = args
        .snapshot
        .unwrap_or_else(|| paths::default_snapshot_path(&state.id));
    if !quiet {
        eprintln!("[run] {} | snapshot: {}", state.id, snapshot.display());
    }

    let state = orchestrator
        .with_snapshot_path(snapshot)
        .start(state)
        .await?;
    print_result(&state, args.session.json)
}

/// Continue a RUNNING snapshot with the current configuration.
pub async fn resume_proposal(
    snapshot: PathBuf,
    session: SessionArgs,
    config: Config,
    quiet: bool,
) -> anyhow::Result<bool> {
    let state = state::load_snapshot(&snapshot)
        .with_context(|| format!("reading snapshot {}", snapshot.display()))?;
    if state.is_done() {
        if !quiet {
            eprintln!("[resume] run {} already finished", state.id);
        }
        return print_result(&state, session.json);
    }

    let orchestrator = build_orchestrator(&config, &session, quiet)?
        .with_cancellation(cancel_on_ctrl_c())
        .with_snapshot_path(snapshot.clone());
    let state = orchestrator.resume(state).await?;
    print_result(&state, session.json)
}

/// Print a snapshot without touching it.
pub fn show_snapshot(snapshot: &Path, json: bool) -> anyhow::Result<bool> {
    let state = state::load_snapshot(snapshot)
        .with_context(|| format!("reading snapshot {}", snapshot.display()))?;

    if !json {
        eprintln!("run:        {}", state.id);
        eprintln!("problem:    {}", state.input.text);
        eprintln!("status:     {:?}", state.status);
        eprintln!("rounds:     {}", state.iteration);
        for (i, eval) in state.evaluations.iter().enumerate() {
            eprintln!("  iteration {}: {}", i, summarize(eval));
        }
    }
    // Showing a failed run is not itself a failure
    print_result(&state, json)?;
    Ok(true)
}

fn build_orchestrator(
    config: &Config,
    session: &SessionArgs,
    quiet: bool,
) -> anyhow::Result<Orchestrator> {
    let api_key = std::env::var(&config.provider.api_key_env).map_err(|_| {
        anyhow::anyhow!(
            "{} is not set. Export your API key or set [provider].api_key_env in config.toml.",
            config.provider.api_key_env
        )
    })?;

    let base: Arc<dyn ModelProvider> = Arc::new(OpenAICompatProvider::new(
        "dashscope",
        api_key,
        config.provider.base_url.clone(),
        config.provider.models.clone(),
    ));
    let provider: Arc<dyn ModelProvider> = Arc::new(RetryProvider::new(
        base,
        RetryPolicy::default().with_max_retries(config.provider.max_retries),
    ));

    let mut factory = LlmAgentFactory::new(provider);
    if let Some(dir) = &session.references {
        let retriever = InMemoryRetriever::from_dir(dir)
            .with_context(|| format!("loading references from {}", dir.display()))?;
        if !quiet {
            eprintln!("[refs] {} document(s) from {}", retriever.len(), dir.display());
        }
        factory = factory.with_retriever(Arc::new(retriever) as Arc<dyn Retriever>);
    }

    let run_config = RunConfig::from_config(config)?;
    let mut orchestrator = Orchestrator::new(run_config, &factory)?;
    if !quiet {
        let roles = orchestrator.roles();
        eprintln!(
            "[models] proposer={} critic={} optimizer={}",
            roles.proposer, roles.critic, roles.optimizer
        );
        orchestrator = orchestrator.with_progress(super::progress::terminal_progress());
    }
    if session.review {
        orchestrator = orchestrator.with_review_gate(Arc::new(TerminalReview));
    }
    Ok(orchestrator)
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n[cancel] stopping after the current call...");
            trigger.cancel();
        }
    });
    token
}

/// Read a problem statement from TOML or JSON (chosen by extension).
pub fn load_input(path: &Path) -> anyhow::Result<ProposalInput> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading input {}", path.display()))?;
    let input: ProposalInput = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&raw)?,
        _ => toml::from_str(&raw)?,
    };
    Ok(input)
}

fn summarize(eval: &Evaluation) -> String {
    let scores: Vec<String> = eval
        .dimensions
        .values()
        .map(|d| format!("{}={:.1}", d.dimension, d.score))
        .collect();
    let mut line = format!("overall={:.1} [{}]", eval.overall_score, scores.join(" "));
    if eval.is_degraded() {
        line.push_str(&format!(" degraded: {} failed", eval.failures.len()));
    }
    for d in eval.dimensions.values().filter(|d| !d.feedback.is_empty()) {
        line.push_str(&format!("\n    {}: {}", d.dimension, d.feedback));
    }
    line
}

/// Final proposal to stdout (or the whole state as JSON). Returns whether the
/// run ended successfully.
fn print_result(state: &WorkflowState, json: bool) -> anyhow::Result<bool> {
    if json {
        println!("{}", serde_json::to_string_pretty(state)?);
    } else if let Some(proposal) = state.current_proposal() {
        println!("{}", proposal.content);
    }

    let success = state.termination.as_ref().is_some_and(|t| t.is_success());
    if let Some(t) = &state.termination {
        if !success {
            eprintln!("error: run ended: {}", t);
        }
    }
    Ok(success)
}

/// Asks on the terminal whether to spend another optimization round.
struct TerminalReview;

#[async_trait]
impl ReviewGate for TerminalReview {
    async fn review(&self, proposal: &Proposal, evaluation: &Evaluation) -> ReviewDecision {
        eprintln!(
            "\n[review] iteration {}: {}",
            proposal.iteration,
            summarize(evaluation)
        );
        for s in &evaluation.suggestions {
            eprintln!("  - {}", s);
        }

        let answer = tokio::task::spawn_blocking(|| {
            inquire::Confirm::new("Run another optimization round?")
                .with_default(true)
                .prompt()
        })
        .await;

        match answer {
            Ok(Ok(true)) => ReviewDecision::Proceed,
            Ok(Ok(false)) => ReviewDecision::Stop,
            Ok(Err(e)) => {
                tracing::warn!("Review prompt failed: {}", e);
                ReviewDecision::Cancel
            }
            Err(e) => {
                tracing::warn!("Review prompt task failed: {}", e);
                ReviewDecision::Cancel
            }
        }
    }
}
