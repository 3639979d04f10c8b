//! Per-instance plan evaluation.
//!
//! An evaluator run plans exactly one resource instance by executing a
//! statically assembled pipeline of steps over an explicit [`EvalContext`].
//! Managed and data resources get different pipelines; see
//! [`managed_pipeline`] and [`data_pipeline`].

mod context;
mod evaluator;
mod pipeline;
mod steps;

pub use context::{Collaborators, EvalContext, Slot};
pub use evaluator::{InstancePipeline, InstancePlanner, data_pipeline, managed_pipeline};
pub use pipeline::{Conditional, Operation, Predicate, Sequence};
pub use steps::{
    CheckPreventDestroy, Diff, GetProvider, ReadDataPlan, ReadState, Refresh,
    RefreshLifecycleGuard, StateSource, ValidateSelfRef, WriteDiff, WriteState,
};
