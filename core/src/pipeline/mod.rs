// core/src/pipeline/mod.rs

//! A small step-pipeline engine.
//!
//! Multi-step write paths (status transitions, webhook ingress) are declared
//! as ordered, named steps. Each step may be optional or carry a skip
//! condition, and any handler can halt the run early with
//! `PipelineControl::Stop`.

pub mod context_data;
pub mod control;
pub mod definition;
pub mod execution;
pub mod step;

pub use context_data::ContextData;
pub use control::{PipelineControl, PipelineResult};
pub use definition::{Handler, Pipeline};
pub use step::{skip_when, SkipCondition, StepDef};
