// src/infra/paths.rs — Config and state locations
//
// PROPOSER_HOME overrides everything. Otherwise config lives in ~/.proposer/
// and run snapshots under the platform data directory.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

fn proposer_home() -> Option<PathBuf> {
    std::env::var_os("PROPOSER_HOME").map(PathBuf::from)
}

/// Configuration directory: $PROPOSER_HOME/ or ~/.proposer/
pub fn config_dir() -> PathBuf {
    if let Some(home) = proposer_home() {
        return home;
    }
    BaseDirs::new()
        .map(|b| b.home_dir().join(".proposer"))
        .unwrap_or_else(|| PathBuf::from(".proposer"))
}

/// Data directory: $PROPOSER_HOME/data/ or the XDG data dir.
pub fn data_dir() -> PathBuf {
    if let Some(home) = proposer_home() {
        return home.join("data");
    }
    ProjectDirs::from("", "", "proposer")
        .map(|p| p.data_local_dir().to_path_buf())
        .unwrap_or_else(|| config_dir().join("data"))
}

pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Where run snapshots go when the caller does not name a file.
pub fn state_dir() -> PathBuf {
    data_dir().join("runs")
}

pub fn default_snapshot_path(run_id: &str) -> PathBuf {
    state_dir().join(format!("{run_id}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_is_toml_in_config_dir() {
        let path = config_file_path();
        assert!(path.ends_with("config.toml"));
        assert_eq!(path.parent(), Some(config_dir().as_path()));
    }

    #[test]
    fn test_default_snapshot_path() {
        let p = default_snapshot_path("abc");
        assert!(p.ends_with("runs/abc.json"));
    }
}
