// src/evaluator/parser.rs — Parse critic replies into dimension results

use serde_json::Value;

use crate::core::types::{Dimension, DimensionResult};
use crate::evaluator::aggregator::MAX_SCORE;
use crate::infra::errors::{ProposerError, Result};

/// Parse a critic model reply for one dimension.
///
/// Preferred format is a JSON object (optionally inside a fenced block):
/// ```text
/// {"score": 7.5, "feedback": "...", "suggestions": ["...", "..."]}
/// ```
/// Per-goal breakdowns (`{"overall_score": 7, "evaluations": {"goal": {"suggestions": "..."}}}`)
/// are accepted too. Without JSON, falls back to a line format:
/// ```text
/// SCORE: 7.5
/// FEEDBACK: one-paragraph rationale
/// SUGGESTIONS:
/// - first change
/// - second change
/// ```
pub fn parse_critic_response(response: &str, dimension: Dimension) -> Result<DimensionResult> {
    let Reply {
        score,
        feedback,
        suggestions,
    } = match extract_json(response) {
        Some(value) => parse_json_reply(&value)?,
        None => parse_line_reply(response)?,
    };

    if !score.is_finite() || !(0.0..=MAX_SCORE).contains(&score) {
        return Err(ProposerError::Other(anyhow::anyhow!(
            "critic score {} outside [0, {}]",
            score,
            MAX_SCORE
        )));
    }

    Ok(DimensionResult {
        dimension,
        score,
        feedback,
        suggestions,
    })
}

struct Reply {
    score: f64,
    feedback: String,
    suggestions: Vec<String>,
}

/// Find the outermost JSON object in the reply.
fn extract_json(response: &str) -> Option<Value> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&response[start..=end])
        .ok()
        .filter(Value::is_object)
}

fn parse_json_reply(value: &Value) -> Result<Reply> {
    let score = ["score", "overall_score", "rating"]
        .iter()
        .find_map(|key| as_number(&value[*key]))
        .ok_or_else(|| {
            ProposerError::Other(anyhow::anyhow!("critic reply has no numeric score"))
        })?;

    let feedback = ["feedback", "overall_feedback"]
        .iter()
        .filter_map(|key| value[*key].as_str())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string();

    let mut suggestions = string_list(&value["suggestions"]);

    // Per-goal breakdown: "goal: suggestion"
    if let Some(per_goal) = value["evaluations"].as_object() {
        for (goal, detail) in per_goal {
            for s in string_list(&detail["suggestions"]) {
                suggestions.push(format!("{}: {}", goal, s));
            }
        }
    }

    Ok(Reply {
        score,
        feedback,
        suggestions,
    })
}

fn parse_line_reply(response: &str) -> Result<Reply> {
    let mut score = None;
    let mut feedback = String::new();
    let mut suggestions = Vec::new();
    let mut in_suggestions = false;

    for line in response.lines() {
        let trimmed = line.trim();
        let upper = trimmed.to_ascii_uppercase();

        if upper.starts_with("SCORE:") {
            in_suggestions = false;
            score = parse_score_value(&trimmed["SCORE:".len()..]);
            continue;
        }
        if upper.starts_with("FEEDBACK:") {
            in_suggestions = false;
            feedback = trimmed["FEEDBACK:".len()..].trim().to_string();
            continue;
        }
        if upper.starts_with("SUGGESTIONS:") {
            in_suggestions = true;
            let rest = trimmed["SUGGESTIONS:".len()..].trim();
            if !rest.is_empty() {
                suggestions.push(rest.to_string());
            }
            continue;
        }
        if in_suggestions {
            let item = trimmed.trim_start_matches(['-', '*']).trim();
            if !item.is_empty() {
                suggestions.push(item.to_string());
            }
        }
    }

    let score = score.ok_or_else(|| {
        ProposerError::Other(anyhow::anyhow!("critic reply has no score line"))
    })?;
    Ok(Reply {
        score,
        feedback,
        suggestions,
    })
}

/// "7.5", "7.5/10", " 8 " → number
fn parse_score_value(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let number = raw.split('/').next().unwrap_or(raw).trim();
    number.parse().ok()
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_score_value(s),
        _ => None,
    }
}

/// Accept `["a", "b"]` or a single string with one suggestion per line.
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Value::String(s) => s
            .lines()
            .map(|l| l.trim().trim_start_matches(['-', '*']).trim())
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}
