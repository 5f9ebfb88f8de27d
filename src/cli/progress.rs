// src/cli/progress.rs — Terminal progress renderer
//
// Everything goes to stderr so stdout carries only the final proposal.

use crate::core::types::ProgressEvent;

/// One status line for `event`.
pub fn format_event(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::Generated { chars } => {
            format!("[draft] initial proposal ({} chars)", chars)
        }
        ProgressEvent::EvaluationReady {
            iteration,
            score,
            degraded,
        } => {
            let note = if *degraded { " (degraded)" } else { "" };
            format!("[iter {}] score={:.1}{}", iteration, score, note)
        }
        ProgressEvent::Arbitrated { iteration, verdict } => {
            format!("[iter {}] -> {}", iteration, verdict)
        }
        ProgressEvent::Optimized { iteration, chars } => {
            format!("[iter {}] revised proposal ({} chars)", iteration, chars)
        }
        ProgressEvent::Complete {
            iterations,
            final_score,
            termination,
        } => match final_score {
            Some(score) => format!(
                "[done] score={:.1} rounds={} ({})",
                score, iterations, termination
            ),
            None => format!("[done] rounds={} ({})", iterations, termination),
        },
    }
}

/// Progress callback for `Orchestrator::with_progress()`.
pub fn terminal_progress() -> impl Fn(ProgressEvent) + Send + Sync + 'static {
    move |event| eprintln!("{}", format_event(&event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{FailureKind, StopReason, Termination, Verdict};

    #[test]
    fn test_generated_format() {
        assert_eq!(
            format_event(&ProgressEvent::Generated { chars: 120 }),
            "[draft] initial proposal (120 chars)"
        );
    }

    #[test]
    fn test_evaluation_format() {
        let line = format_event(&ProgressEvent::EvaluationReady {
            iteration: 1,
            score: 7.25,
            degraded: false,
        });
        assert_eq!(line, "[iter 1] score=7.2");

        let line = format_event(&ProgressEvent::EvaluationReady {
            iteration: 0,
            score: 6.0,
            degraded: true,
        });
        assert_eq!(line, "[iter 0] score=6.0 (degraded)");
    }

    #[test]
    fn test_arbitration_format() {
        let line = format_event(&ProgressEvent::Arbitrated {
            iteration: 2,
            verdict: Verdict::Stop(StopReason::IterationLimit),
        });
        assert_eq!(line, "[iter 2] -> stop (limit)");
    }

    #[test]
    fn test_complete_format() {
        let line = format_event(&ProgressEvent::Complete {
            iterations: 1,
            final_score: Some(8.2),
            termination: Termination::Accepted { score: 8.2 },
        });
        assert_eq!(line, "[done] score=8.2 rounds=1 (accepted (score 8.2))");

        let line = format_event(&ProgressEvent::Complete {
            iterations: 0,
            final_score: None,
            termination: Termination::Failed {
                kind: FailureKind::Proposer,
                message: "timeout".into(),
            },
        });
        assert_eq!(line, "[done] rounds=0 (proposer failed: timeout)");
    }
}
