// src/evaluator/aggregator.rs — Fan-in of per-dimension results

use std::collections::{BTreeMap, HashSet};

use crate::core::types::{
    Dimension, DimensionFailure, DimensionOutcome, DimensionResult, Evaluation,
};
use crate::infra::errors::{ProposerError, Result};

/// Highest score a dimension may report.
pub const MAX_SCORE: f64 = 10.0;

/// How dimension results are combined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationPolicy {
    /// Per-dimension weights. `None` means an unweighted mean; dimensions
    /// missing from the map weigh 1.0.
    pub weights: Option<BTreeMap<Dimension, f64>>,
    /// Aggregate what succeeded and flag the evaluation degraded instead of
    /// failing when an evaluator fails or never reports.
    pub tolerate_failures: bool,
}

impl AggregationPolicy {
    pub fn weight_of(&self, dimension: Dimension) -> f64 {
        self.weights
            .as_ref()
            .and_then(|w| w.get(&dimension).copied())
            .unwrap_or(1.0)
    }

    /// Sum of the weights of `active`.
    pub fn active_weight(&self, active: &[Dimension]) -> f64 {
        active.iter().map(|d| self.weight_of(*d)).sum()
    }
}

/// Combine one outcome per active dimension into an `Evaluation`.
///
/// Outcomes may arrive in any order; the result only depends on their
/// contents.
pub fn aggregate(
    active: &[Dimension],
    outcomes: Vec<DimensionOutcome>,
    policy: &AggregationPolicy,
) -> Result<Evaluation> {
    let mut by_dimension: BTreeMap<Dimension, DimensionOutcome> = BTreeMap::new();
    for outcome in outcomes {
        let dimension = match &outcome {
            Ok(result) => result.dimension,
            Err(failure) => failure.dimension,
        };
        if !active.contains(&dimension) {
            return Err(ProposerError::Aggregation(format!(
                "result for inactive dimension '{}'",
                dimension
            )));
        }
        if let Ok(result) = &outcome {
            check_score(result)?;
        }
        if by_dimension.insert(dimension, outcome).is_some() {
            return Err(ProposerError::Aggregation(format!(
                "duplicate result for dimension '{}'",
                dimension
            )));
        }
    }

    let mut dimensions = BTreeMap::new();
    let mut failures = Vec::new();
    let mut ordered: Vec<Dimension> = active.to_vec();
    ordered.sort();
    ordered.dedup();

    for dimension in ordered {
        let failure = match by_dimension.remove(&dimension) {
            Some(Ok(result)) => {
                dimensions.insert(dimension, result);
                continue;
            }
            Some(Err(failure)) => failure,
            None => DimensionFailure {
                dimension,
                reason: "no result reported".into(),
            },
        };
        if !policy.tolerate_failures {
            return Err(ProposerError::Aggregation(format!(
                "dimension '{}' missing: {}",
                failure.dimension, failure.reason
            )));
        }
        failures.push(failure);
    }

    if dimensions.is_empty() {
        return Err(ProposerError::Aggregation(
            "no dimension produced a usable result".into(),
        ));
    }

    let overall_score = composite_score(&dimensions, policy)?;
    let suggestions = merge_suggestions(&dimensions);

    Ok(Evaluation {
        overall_score,
        dimensions,
        suggestions,
        failures,
    })
}

fn check_score(result: &DimensionResult) -> Result<()> {
    if !result.score.is_finite() || !(0.0..=MAX_SCORE).contains(&result.score) {
        return Err(ProposerError::Aggregation(format!(
            "score {} for '{}' is outside [0, {}]",
            result.score, result.dimension, MAX_SCORE
        )));
    }
    Ok(())
}

/// Weighted mean of the dimension scores, rounded to one decimal.
pub fn composite_score(
    dimensions: &BTreeMap<Dimension, DimensionResult>,
    policy: &AggregationPolicy,
) -> Result<f64> {
    let total_weight: f64 = dimensions.keys().map(|d| policy.weight_of(*d)).sum();
    if total_weight <= 0.0 {
        return Err(ProposerError::Aggregation(
            "weights of the scored dimensions sum to zero".into(),
        ));
    }
    let weighted: f64 = dimensions
        .values()
        .map(|r| r.score * policy.weight_of(r.dimension))
        .sum();
    Ok(round_one_decimal(weighted / total_weight))
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Concatenate suggestions in canonical dimension order, dropping exact
/// duplicates after their first occurrence.
pub fn merge_suggestions(dimensions: &BTreeMap<Dimension, DimensionResult>) -> Vec<String> {
    let mut seen = HashSet::new();
    dimensions
        .values()
        .flat_map(|r| r.suggestions.iter())
        .filter(|s| seen.insert(*s))
        .cloned()
        .collect()
}
