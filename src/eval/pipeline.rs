//! Pipeline machinery: operations, sequences and conditionals.
//!
//! Pipelines are assembled statically, so the full list of side effects of
//! a run can be read off with [`Operation::describe`] before anything
//! executes.

use async_trait::async_trait;
use std::fmt;
use tracing::debug;

use crate::error::{PlannerError, Result};

use super::context::EvalContext;

/// One unit of work in an evaluator run.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Step name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Runs the step against the context.
    async fn execute(&self, ctx: &mut EvalContext<'_>) -> Result<()>;

    /// Appends the names of the leaf steps this operation may run.
    fn describe(&self, out: &mut Vec<&'static str>) {
        out.push(self.name());
    }
}

/// Predicate deciding whether a [`Conditional`] body runs.
pub type Predicate = fn(&EvalContext<'_>) -> bool;

/// Ordered composite. Stops at the first failing step.
#[derive(Default)]
pub struct Sequence {
    steps: Vec<Box<dyn Operation>>,
}

impl Sequence {
    /// Creates an empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step.
    #[must_use]
    pub fn then(mut self, step: impl Operation + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Number of direct children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the sequence has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Flattened leaf step names in execution order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        self.describe(&mut out);
        out
    }
}

#[async_trait]
impl Operation for Sequence {
    fn name(&self) -> &'static str {
        "Sequence"
    }

    async fn execute(&self, ctx: &mut EvalContext<'_>) -> Result<()> {
        for step in &self.steps {
            if ctx.is_cancelled() {
                return Err(PlannerError::Cancelled {
                    address: ctx.address().to_string(),
                    step: step.name(),
                });
            }
            debug!("{}: running {}", ctx.address(), step.name());
            step.execute(ctx).await?;
        }
        Ok(())
    }

    fn describe(&self, out: &mut Vec<&'static str>) {
        for step in &self.steps {
            step.describe(out);
        }
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.step_names()).finish()
    }
}

/// Runs a nested sequence when a side-effect-free predicate holds.
pub struct Conditional {
    label: &'static str,
    predicate: Predicate,
    body: Sequence,
}

impl Conditional {
    /// Creates a conditional.
    #[must_use]
    pub const fn new(label: &'static str, predicate: Predicate, body: Sequence) -> Self {
        Self { label, predicate, body }
    }
}

#[async_trait]
impl Operation for Conditional {
    fn name(&self) -> &'static str {
        self.label
    }

    async fn execute(&self, ctx: &mut EvalContext<'_>) -> Result<()> {
        if (self.predicate)(ctx) {
            self.body.execute(ctx).await
        } else {
            debug!("{}: skipping {}", ctx.address(), self.label);
            Ok(())
        }
    }

    fn describe(&self, out: &mut Vec<&'static str>) {
        self.body.describe(out);
    }
}

impl fmt::Debug for Conditional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conditional")
            .field("label", &self.label)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addrs::ResourceInstanceAddress;
    use crate::config::ResourceConfig;
    use crate::error::{PipelineError, ProviderError};
    use crate::eval::context::Collaborators;
    use crate::plans::MemoryDiffStore;
    use crate::providers::ProviderRegistry;
    use crate::state::MemoryStateStore;
    use std::sync::{Arc, Mutex};
    use tokio_util::sync::CancellationToken;

    struct Record {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    #[async_trait]
    impl Operation for Record {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn execute(&self, _ctx: &mut EvalContext<'_>) -> Result<()> {
            self.log.lock().expect("lock").push(self.name);
            if self.fail {
                return Err(PlannerError::provider(
                    "aws_instance.web",
                    crate::error::ProviderCall::ReadResource,
                    ProviderError::unreachable("down"),
                ));
            }
            Ok(())
        }
    }

    struct Fixture {
        registry: ProviderRegistry,
        state: MemoryStateStore,
        diffs: MemoryDiffStore,
        config: ResourceConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: ProviderRegistry::new(),
                state: MemoryStateStore::new(),
                diffs: MemoryDiffStore::new(),
                config: ResourceConfig::new("aws"),
            }
        }

        fn context(&self) -> EvalContext<'_> {
            let address: ResourceInstanceAddress = "aws_instance.web".parse().expect("parse");
            EvalContext::new(
                address,
                &self.config,
                Collaborators {
                    resolver: &self.registry,
                    state: &self.state,
                    diffs: &self.diffs,
                },
            )
        }
    }

    fn record(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>, fail: bool) -> Record {
        Record { name, log: Arc::clone(log), fail }
    }

    fn always(_: &EvalContext<'_>) -> bool {
        true
    }

    fn never(_: &EvalContext<'_>) -> bool {
        false
    }

    #[tokio::test]
    async fn test_sequence_short_circuits() {
        let fixture = Fixture::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let seq = Sequence::new()
            .then(record("A", &log, false))
            .then(record("B", &log, true))
            .then(record("C", &log, false));

        let mut ctx = fixture.context();
        let err = seq.execute(&mut ctx).await.expect_err("B fails");

        assert!(matches!(err, PlannerError::Provider { .. }));
        assert_eq!(*log.lock().expect("lock"), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_conditional_false_is_noop() {
        let fixture = Fixture::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let seq = Sequence::new()
            .then(Conditional::new("Skipped", never, Sequence::new().then(record("X", &log, true))))
            .then(Conditional::new("Taken", always, Sequence::new().then(record("Y", &log, false))));

        let mut ctx = fixture.context();
        seq.execute(&mut ctx).await.expect("run");

        assert_eq!(*log.lock().expect("lock"), vec!["Y"]);
        assert_eq!(seq.step_names(), vec!["X", "Y"]);
    }

    #[tokio::test]
    async fn test_cancellation_before_next_step() {
        let fixture = Fixture::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let token = CancellationToken::new();
        token.cancel();

        let seq = Sequence::new().then(record("First", &log, false));
        let mut ctx = fixture.context().with_cancellation(token);
        let err = seq.execute(&mut ctx).await.expect_err("cancelled");

        assert!(matches!(err, PlannerError::Cancelled { step: "First", .. }));
        assert!(log.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn test_slot_errors_propagate_unchanged() {
        struct ReadsChange;

        #[async_trait]
        impl Operation for ReadsChange {
            fn name(&self) -> &'static str {
                "ReadsChange"
            }

            async fn execute(&self, ctx: &mut EvalContext<'_>) -> Result<()> {
                ctx.change.get(self.name())?;
                Ok(())
            }
        }

        let fixture = Fixture::new();
        let mut ctx = fixture.context();
        let err = Sequence::new().then(ReadsChange).execute(&mut ctx).await.expect_err("unpopulated");

        assert!(matches!(
            err,
            PlannerError::Pipeline(PipelineError::SlotUnpopulated { step: "ReadsChange", slot: "change" })
        ));
        assert!(!err.is_user_facing());
    }
}
