//! Run configuration and end-to-end execution.

mod runner;

pub use runner::{Pipeline, RunConfig, RunSummary};
