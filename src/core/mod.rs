// src/core/mod.rs — Workflow engine

pub mod arbitrator;
pub mod orchestrator;
pub mod state;
pub mod types;
