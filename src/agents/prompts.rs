// src/agents/prompts.rs — Prompt templates for the LLM-backed agents

use minijinja::{context, Environment};

use crate::core::types::{Dimension, Proposal, ProposalInput};
use crate::infra::errors::Result;
use crate::retrieval::Document;

pub const PROPOSER_SYSTEM: &str =
    "You are a proposal writer. Produce a new proposal from the problem statement, goals and constraints.";

pub const OPTIMIZER_SYSTEM: &str =
    "You are a proposal editor. Rewrite the proposal so it addresses the reviewers' feedback while keeping every goal and constraint.";

const PROPOSER_TEMPLATE: &str = r#"Write a detailed proposal for the following problem:
{{ input.text }}

# Goals
{% for goal in input.goals -%}
{{ loop.index }}. {{ goal }}
{% else -%}
(none stated)
{% endfor %}
# Constraints
{% for c in input.constraints -%}
- {{ c.kind }}: {{ c.value }}
{% else -%}
(none stated)
{% endfor %}
{%- if references %}
# References
{% for doc in references -%}
[{{ loop.index }}] {{ doc.content | trim }}{% if doc.source %} (source: {{ doc.source }}){% endif %}
{% endfor %}
Use the references where they are relevant.
{% endif %}
Be as specific as possible and satisfy every goal and constraint."#;

const CRITIC_TEMPLATE: &str = r#"Review the proposal below.

Problem: {{ input.text }}

Proposal:
{{ proposal.content }}

Goals:
{% for goal in input.goals -%}
- {{ goal }}
{% else -%}
(none stated)
{% endfor %}
Constraints:
{% for c in input.constraints -%}
- {{ c.kind }}: {{ c.value }}
{% else -%}
(none stated)
{% endfor %}
Focus only on {{ focus }}.

Reply with a single JSON object and nothing else:
{"score": <number from 0 to 10>, "feedback": "<one paragraph>", "suggestions": ["<concrete change>", ...]}"#;

const OPTIMIZER_TEMPLATE: &str = r#"Improve the proposal using the review below.

# Problem
{{ input.text }}

# Current proposal (revision {{ proposal.iteration }})
{{ proposal.content }}

# Review
{{ digest }}
{%- if references %}

# References
{% for doc in references -%}
[{{ loop.index }}] {{ doc.content | trim }}
{% endfor %}
{%- endif %}

# Goals
{% for goal in input.goals -%}
- {{ goal }}
{% else -%}
(none stated)
{% endfor %}
# Constraints
{% for c in input.constraints -%}
- {{ c.kind }}: {{ c.value }}
{% else -%}
(none stated)
{% endfor %}
Address every key issue, adopt the suggestions in the order given, and return only the full revised proposal."#;

/// Persona line for each critic.
pub fn critic_system(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Logic => {
            "You are a reviewer of reasoning and structure: coherence of the argument, cause and effect, and whether the structure holds together."
        }
        Dimension::Completeness => {
            "You are a reviewer of coverage: check that nothing important is missing and that every part has enough detail."
        }
        Dimension::Innovation => {
            "You are a reviewer of originality: judge how novel the solution is and whether the novelty has practical value."
        }
        Dimension::Feasibility => {
            "You are a reviewer of feasibility: technical viability, resource needs and delivery risk."
        }
    }
}

fn focus(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Logic => "logical soundness and structure",
        Dimension::Completeness => "completeness and level of detail",
        Dimension::Innovation => "originality and practical value of new ideas",
        Dimension::Feasibility => "feasibility of implementation",
    }
}

pub fn render_proposer(input: &ProposalInput, references: &[Document]) -> Result<String> {
    let env = Environment::new();
    Ok(env.render_str(PROPOSER_TEMPLATE, context! { input, references })?)
}

pub fn render_critic(
    proposal: &Proposal,
    dimension: Dimension,
    input: &ProposalInput,
) -> Result<String> {
    let env = Environment::new();
    Ok(env.render_str(
        CRITIC_TEMPLATE,
        context! { proposal, input, focus => focus(dimension) },
    )?)
}

pub fn render_optimizer(
    proposal: &Proposal,
    digest: &str,
    input: &ProposalInput,
    references: &[Document],
) -> Result<String> {
    let env = Environment::new();
    Ok(env.render_str(
        OPTIMIZER_TEMPLATE,
        context! { proposal, digest, input, references },
    )?)
}
