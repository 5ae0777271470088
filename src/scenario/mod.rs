//! Scenario capability: one scripted demonstration sequence.
//!
//! A scenario produces an ordered list of step records through a [`StepSink`].
//! The sink assigns step indices (1..n, headers excluded) so ordering
//! invariants hold no matter how a scenario script numbers itself, and the
//! channel closes when the sink is dropped at the end of `run`.

pub mod mongo;

use crate::model::{ScenarioError, StepResult};
use async_trait::async_trait;
use tokio::sync::mpsc;

#[async_trait]
pub trait Scenario: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// The isolation level being demonstrated, for display.
    fn isolation_level(&self) -> &str;

    /// Prepare state before the run. A failure here short-circuits the run.
    async fn setup(&self) -> Result<(), ScenarioError>;

    /// Execute the demonstration, emitting each step as it happens. The sink
    /// is consumed; dropping it on return signals that no more steps follow.
    async fn run(&self, sink: StepSink) -> Result<(), ScenarioError>;

    /// Remove state created by the run. Invoked unconditionally after `run`.
    async fn cleanup(&self) -> Result<(), ScenarioError>;
}

/// Ordered producer of [`StepResult`]s for a single run.
pub struct StepSink {
    tx: mpsc::UnboundedSender<StepResult>,
    next: u32,
}

impl StepSink {
    pub fn new(tx: mpsc::UnboundedSender<StepResult>) -> Self {
        Self { tx, next: 1 }
    }

    /// Forward one step, assigning the next index unless it is a header.
    /// Sends into an abandoned run are dropped silently; the script keeps
    /// executing to completion either way.
    pub fn emit(&mut self, mut step: StepResult) {
        if !step.is_header {
            step.step = self.next;
            self.next += 1;
        }
        let _ = self.tx.send(step);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) struct MockScenario {
        pub name: &'static str,
    }

    #[async_trait]
    impl Scenario for MockScenario {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "mock description"
        }
        fn isolation_level(&self) -> &str {
            "Mock Level"
        }
        async fn setup(&self) -> Result<(), ScenarioError> {
            Ok(())
        }
        async fn run(&self, _sink: StepSink) -> Result<(), ScenarioError> {
            Ok(())
        }
        async fn cleanup(&self) -> Result<(), ScenarioError> {
            Ok(())
        }
    }

    #[test]
    fn sink_numbers_steps_and_skips_headers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = StepSink::new(tx);

        sink.emit(StepResult::header("intro"));
        sink.emit(StepResult {
            session: "Session A".into(),
            step: 99, // overwritten by the sink
            description: "first".into(),
            query: String::new(),
            result: String::new(),
            success: true,
            is_header: false,
        });
        sink.emit(StepResult {
            session: "Session B".into(),
            step: 0,
            description: "second".into(),
            query: String::new(),
            result: String::new(),
            success: true,
            is_header: false,
        });
        drop(sink);

        let header = rx.try_recv().expect("header");
        assert_eq!(header.step, 0);
        assert_eq!(rx.try_recv().expect("first").step, 1);
        assert_eq!(rx.try_recv().expect("second").step, 2);
        // Dropping the sink closed the channel.
        assert!(rx.try_recv().is_err());
    }
}
