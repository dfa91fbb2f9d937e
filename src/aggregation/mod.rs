//! Aggregation pipelines: stage descriptions executed in order over a document stream.

mod exec;
mod stage;

pub use exec::run_pipeline;
pub use stage::{Accumulator, GROUP_ID, Pipeline, Projection, Stage};
