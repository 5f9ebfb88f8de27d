// src/lib.rs — Library root for proposer

pub mod agents;
pub mod cli;
pub mod core;
pub mod evaluator;
pub mod infra;
pub mod provider;
pub mod retrieval;
