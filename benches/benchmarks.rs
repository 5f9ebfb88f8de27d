// benches/benchmarks.rs — Performance benchmarks (criterion)
//
// The workflow spends nearly all of its wall time waiting on models; these
// cover the local work done between calls:
//   1. Fan-in — aggregation of four dimension results
//   2. Critic reply parsing (JSON and line formats)
//   3. Prompt rendering and reference retrieval

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use proposer::agents::optimizer::FeedbackDigest;
use proposer::agents::prompts::{render_critic, render_optimizer, render_proposer};
use proposer::core::arbitrator::arbitrate;
use proposer::core::types::{Dimension, DimensionOutcome, DimensionResult, Proposal, ProposalInput};
use proposer::evaluator::aggregator::{aggregate, AggregationPolicy};
use proposer::evaluator::parser::parse_critic_response;
use proposer::retrieval::{Document, InMemoryRetriever, Retriever};

// ─── Helpers ────────────────────────────────────────────────────────────────

fn outcomes(suggestions_per_dim: usize) -> Vec<DimensionOutcome> {
    Dimension::ALL
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let suggestions: Vec<String> = (0..suggestions_per_dim)
                .map(|j| format!("suggestion {} for {}", j % 7, d))
                .collect();
            Ok(DimensionResult::new(*d, 5.0 + i as f64).with_suggestions(suggestions))
        })
        .collect()
}

fn input() -> ProposalInput {
    ProposalInput::new("improve team collaboration")
        .with_goal("low cost")
        .with_goal("remote-friendly")
        .with_constraint("budget", "<=5000")
}

fn long_proposal() -> Proposal {
    let body = (0..40)
        .map(|i| format!("Step {i}: run a weekly async review and publish notes to the wiki."))
        .collect::<Vec<_>>()
        .join("\n");
    Proposal::new(body, 1)
}

fn reference_corpus(n: usize) -> InMemoryRetriever {
    let docs = (0..n)
        .map(|i| Document {
            content: format!(
                "Case study {i}: a remote team of {} cut meeting time with async standups \
                 and a shared decision log, staying within a budget of {} per quarter.",
                5 + i % 30,
                1000 * (i % 9)
            ),
            source: Some(format!("case-{i}.md")),
        })
        .collect();
    InMemoryRetriever::new(docs)
}

// ─── Benchmark: Aggregation and arbitration ─────────────────────────────────

fn bench_aggregation(c: &mut Criterion) {
    let policy = AggregationPolicy::default();
    let mut group = c.benchmark_group("aggregation");

    let few = outcomes(3);
    group.bench_function("aggregate_4_dims_3_suggestions", |b| {
        b.iter(|| aggregate(&Dimension::ALL, black_box(few.clone()), &policy))
    });

    let many = outcomes(50);
    group.bench_function("aggregate_4_dims_50_suggestions", |b| {
        b.iter(|| aggregate(&Dimension::ALL, black_box(many.clone()), &policy))
    });

    group.bench_function("arbitrate", |b| {
        b.iter(|| arbitrate(black_box(7.9), black_box(1), 3, 8.5))
    });

    group.finish();
}

// ─── Benchmark: Critic reply parsing ────────────────────────────────────────

fn bench_parser(c: &mut Criterion) {
    let json = r#"Here is my review.
```json
{"score": 7.5, "feedback": "solid plan", "suggestions": ["add a timeline", "name an owner", "budget per quarter"]}
```"#;
    let lines = "SCORE: 6.5\nSUGGESTIONS:\n- add a timeline\n- name an owner\n- budget per quarter\n";

    let mut group = c.benchmark_group("parser");

    group.bench_function("parse_json_reply", |b| {
        b.iter(|| parse_critic_response(black_box(json), Dimension::Logic))
    });

    group.bench_function("parse_line_reply", |b| {
        b.iter(|| parse_critic_response(black_box(lines), Dimension::Feasibility))
    });

    group.finish();
}

// ─── Benchmark: Prompts and retrieval ───────────────────────────────────────

fn bench_prompts(c: &mut Criterion) {
    let input = input();
    let proposal = long_proposal();
    let evaluation = aggregate(&Dimension::ALL, outcomes(5), &AggregationPolicy::default())
        .expect("aggregate");
    let digest = FeedbackDigest::from_evaluation(&evaluation).render();
    let corpus = reference_corpus(200);
    let refs = corpus
        .retrieve("remote team budget async")
        .expect("retrieve");

    let mut group = c.benchmark_group("prompts");

    group.bench_function("render_proposer", |b| {
        b.iter(|| render_proposer(black_box(&input), &refs))
    });

    group.bench_function("render_critic", |b| {
        b.iter(|| render_critic(black_box(&proposal), Dimension::Completeness, &input))
    });

    group.bench_function("render_optimizer", |b| {
        b.iter(|| render_optimizer(black_box(&proposal), &digest, &input, &refs))
    });

    group.bench_function("retrieve_top3_of_200", |b| {
        b.iter(|| corpus.retrieve(black_box("improve remote team collaboration budget")))
    });

    group.finish();
}

// ─── Main ───────────────────────────────────────────────────────────────────

criterion_group!(benches, bench_aggregation, bench_parser, bench_prompts);
criterion_main!(benches);
