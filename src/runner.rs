//! Scenario execution pipeline.
//!
//! One pipeline per run: setup, then a spawned worker streaming steps, then
//! unconditional cleanup, then exactly one completion event. Consumers (the
//! TUI command executor, the headless runner) attach their own generation
//! tags when forwarding; the pipeline itself only guarantees ordering and the
//! single-completion contract.

use crate::model::{ScenarioError, StepResult};
use crate::scenario::{Scenario, StepSink};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};

/// Events produced by one scenario run, in production order. `Completed` is
/// always last and always sent exactly once.
#[derive(Debug)]
pub enum RunEvent {
    Step(StepResult),
    Completed { error: Option<ScenarioError> },
}

/// Execute `scenario` to completion, forwarding every step into `tx` as it is
/// produced.
///
/// A setup failure short-circuits: no worker is spawned, no steps are
/// emitted, and the single `Completed` carries the setup error. Otherwise the
/// run worker streams steps until it drops its sink; cleanup then runs
/// unconditionally and its error is logged but never allowed to mask the
/// run's own result.
pub async fn run_scenario(scenario: Arc<dyn Scenario>, tx: UnboundedSender<RunEvent>) {
    if let Err(e) = scenario.setup().await {
        tracing::warn!(scenario = scenario.name(), error = %e, "scenario setup failed");
        let _ = tx.send(RunEvent::Completed { error: Some(e) });
        return;
    }

    let (step_tx, mut step_rx) = mpsc::unbounded_channel();
    let worker = {
        let scenario = scenario.clone();
        tokio::spawn(async move { scenario.run(StepSink::new(step_tx)).await })
    };

    // The worker owns the only sender; this loop ends when the sink drops.
    while let Some(step) = step_rx.recv().await {
        let _ = tx.send(RunEvent::Step(step));
    }

    let run_error = match worker.await {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e),
        Err(join) => Some(ScenarioError::Run(format!("scenario worker panicked: {join}"))),
    };

    if let Err(e) = scenario.cleanup().await {
        tracing::warn!(scenario = scenario.name(), error = %e, "scenario cleanup failed");
    }

    let _ = tx.send(RunEvent::Completed { error: run_error });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct ScriptedScenario {
        fail_setup: bool,
        fail_run: bool,
        fail_cleanup: bool,
        steps: Vec<&'static str>,
        cleanups: AtomicUsize,
    }

    #[async_trait]
    impl Scenario for ScriptedScenario {
        fn name(&self) -> &str {
            "scripted"
        }
        fn description(&self) -> &str {
            "test scenario"
        }
        fn isolation_level(&self) -> &str {
            "None"
        }
        async fn setup(&self) -> Result<(), ScenarioError> {
            if self.fail_setup {
                Err(ScenarioError::Setup("boom".into()))
            } else {
                Ok(())
            }
        }
        async fn run(&self, mut sink: StepSink) -> Result<(), ScenarioError> {
            for desc in &self.steps {
                sink.emit(StepResult {
                    session: "Session A".into(),
                    step: 0,
                    description: (*desc).into(),
                    query: String::new(),
                    result: String::new(),
                    success: true,
                    is_header: false,
                });
            }
            if self.fail_run {
                Err(ScenarioError::Run("run failed".into()))
            } else {
                Ok(())
            }
        }
        async fn cleanup(&self) -> Result<(), ScenarioError> {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
            if self.fail_cleanup {
                Err(ScenarioError::Cleanup("cleanup failed".into()))
            } else {
                Ok(())
            }
        }
    }

    async fn drain(mut rx: mpsc::UnboundedReceiver<RunEvent>) -> (Vec<StepResult>, Vec<Option<String>>) {
        let mut steps = Vec::new();
        let mut completions = Vec::new();
        while let Some(ev) = rx.recv().await {
            match ev {
                RunEvent::Step(s) => steps.push(s),
                RunEvent::Completed { error } => completions.push(error.map(|e| e.to_string())),
            }
        }
        (steps, completions)
    }

    #[tokio::test]
    async fn setup_failure_emits_one_completion_and_no_steps() {
        let scenario = Arc::new(ScriptedScenario {
            fail_setup: true,
            ..Default::default()
        });
        let (tx, rx) = mpsc::unbounded_channel();
        run_scenario(scenario.clone(), tx).await;

        let (steps, completions) = drain(rx).await;
        assert!(steps.is_empty());
        assert_eq!(completions.len(), 1);
        assert!(completions[0].as_deref().unwrap().contains("setup failed"));
        // No worker ran, so no cleanup either.
        assert_eq!(scenario.cleanups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn steps_arrive_in_order_with_increasing_indices() {
        let scenario = Arc::new(ScriptedScenario {
            steps: vec!["one", "two", "three"],
            ..Default::default()
        });
        let (tx, rx) = mpsc::unbounded_channel();
        run_scenario(scenario.clone(), tx).await;

        let (steps, completions) = drain(rx).await;
        assert_eq!(
            steps.iter().map(|s| s.description.as_str()).collect::<Vec<_>>(),
            vec!["one", "two", "three"]
        );
        assert_eq!(steps.iter().map(|s| s.step).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(completions, vec![None]);
        assert_eq!(scenario.cleanups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_error_still_runs_cleanup_and_surfaces_the_run_error() {
        let scenario = Arc::new(ScriptedScenario {
            fail_run: true,
            steps: vec!["partial"],
            ..Default::default()
        });
        let (tx, rx) = mpsc::unbounded_channel();
        run_scenario(scenario.clone(), tx).await;

        let (steps, completions) = drain(rx).await;
        assert_eq!(steps.len(), 1);
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].as_deref(), Some("run failed"));
        assert_eq!(scenario.cleanups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cleanup_error_never_masks_a_successful_run() {
        let scenario = Arc::new(ScriptedScenario {
            fail_cleanup: true,
            steps: vec!["only"],
            ..Default::default()
        });
        let (tx, rx) = mpsc::unbounded_channel();
        run_scenario(scenario.clone(), tx).await;

        let (_steps, completions) = drain(rx).await;
        assert_eq!(completions, vec![None]);
    }
}
