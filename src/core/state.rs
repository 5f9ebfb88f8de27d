// src/core/state.rs — Run snapshots for inspection and resumption
//
// The orchestrator writes the full WorkflowState after every phase. Writes
// go through a temp file + rename so a crash never leaves a torn snapshot.

use std::io::Write;
use std::path::Path;

use super::types::WorkflowState;
use crate::infra::errors::{ProposerError, Result};

/// Atomically write `state` as pretty JSON to `path`.
pub fn save_snapshot(state: &WorkflowState, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    let json = serde_json::to_string_pretty(state)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot.json".into());
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    let mut f = std::fs::File::create(&tmp)?;
    f.write_all(json.as_bytes())?;
    f.flush()?;
    f.sync_all()?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Read a snapshot and check that its histories are consistent.
pub fn load_snapshot(path: &Path) -> Result<WorkflowState> {
    let raw = std::fs::read_to_string(path)?;
    let state: WorkflowState = serde_json::from_str(&raw)?;
    check_histories(&state)?;
    Ok(state)
}

/// Every proposal but the latest must have its evaluation, at the same index.
pub(crate) fn check_histories(state: &WorkflowState) -> Result<()> {
    let pending = state.proposals.len().checked_sub(state.evaluations.len());
    if !matches!(pending, Some(0) | Some(1)) {
        return Err(ProposerError::InvalidInput(format!(
            "snapshot has {} evaluations for {} proposals",
            state.evaluations.len(),
            state.proposals.len()
        )));
    }
    if let Some((idx, p)) = state
        .proposals
        .iter()
        .enumerate()
        .find(|(i, p)| p.iteration as usize != *i)
    {
        return Err(ProposerError::InvalidInput(format!(
            "snapshot proposal #{} is tagged iteration {}",
            idx, p.iteration
        )));
    }
    if state.iteration != state.optimization_rounds() {
        return Err(ProposerError::InvalidInput(format!(
            "snapshot iteration counter {} does not match {} proposals",
            state.iteration,
            state.proposals.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Evaluation, Proposal, ProposalInput};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn evaluation(score: f64) -> Evaluation {
        Evaluation {
            overall_score: score,
            dimensions: BTreeMap::new(),
            suggestions: vec![],
            failures: vec![],
        }
    }

    /// `proposals` revisions; all but the latest already evaluated.
    fn state_with(proposals: usize) -> WorkflowState {
        let mut state = WorkflowState::new(
            ProposalInput::new("improve team collaboration").with_goal("low cost"),
        );
        for i in 0..proposals {
            state.proposals.push(Proposal::new(format!("v{i}"), i as u32));
        }
        for _ in 1..proposals {
            state.evaluations.push(evaluation(5.0));
        }
        state.iteration = proposals.saturating_sub(1) as u32;
        state
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("runs").join("run.json");
        let state = state_with(2);

        save_snapshot(&state, &path).unwrap();
        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.json");
        save_snapshot(&state_with(1), &path).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["run.json".to_string()]);
    }

    #[test]
    fn test_load_rejects_misaligned_iterations() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.json");
        let mut state = state_with(2);
        state.proposals[1].iteration = 5;
        save_snapshot(&state, &path).unwrap();

        let err = load_snapshot(&path).unwrap_err();
        assert!(matches!(err, ProposerError::InvalidInput(_)));
    }

    #[test]
    fn test_load_rejects_unevaluated_history() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.json");
        let mut state = state_with(2);
        state.evaluations.clear();
        save_snapshot(&state, &path).unwrap();

        let err = load_snapshot(&path).unwrap_err();
        assert!(err.to_string().contains("0 evaluations for 2 proposals"));
    }

    #[test]
    fn test_one_pending_evaluation_is_consistent() {
        let mut state = state_with(2);
        assert!(check_histories(&state).is_ok());
        state.evaluations.push(evaluation(6.0));
        assert!(check_histories(&state).is_ok());
        state.evaluations.push(evaluation(7.0));
        assert!(check_histories(&state).is_err());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            load_snapshot(&path).unwrap_err(),
            ProposerError::Json(_)
        ));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_snapshot(&dir.path().join("nope.json")).unwrap_err(),
            ProposerError::Io(_)
        ));
    }
}
