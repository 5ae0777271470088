//! MongoDB demonstration scenarios.
//!
//! Each scenario is a `mongosh` script that holds the driver sessions and
//! transactions, prints one JSON object per step, and paces itself with
//! `sleep()`. The Rust side streams the child's stdout and forwards every
//! parsed step through the sink the moment it appears, so the UI renders the
//! demonstration live.

mod dirty_read;
mod read_committed;
mod snapshot;
mod write_conflict;

pub use dirty_read::DirtyReadScenario;
pub use read_committed::ReadCommittedScenario;
pub use snapshot::SnapshotIsolationScenario;
pub use write_conflict::WriteConflictScenario;

use crate::model::{ScenarioError, StepResult};
use crate::provider::mongo::MongoShell;
use crate::scenario::{Scenario, StepSink};
use serde::Deserialize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// All MongoDB scenarios in display order.
pub fn all(shell: MongoShell) -> Vec<Arc<dyn Scenario>> {
    vec![
        Arc::new(DirtyReadScenario::new(shell.clone())),
        Arc::new(ReadCommittedScenario::new(shell.clone())),
        Arc::new(SnapshotIsolationScenario::new(shell.clone())),
        Arc::new(WriteConflictScenario::new(shell)),
    ]
}

/// Step record as printed by the scripts. Indices are assigned by the sink.
#[derive(Debug, Deserialize)]
struct RawStep {
    #[serde(default)]
    session: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    query: String,
    #[serde(default)]
    result: String,
    #[serde(default = "default_true")]
    success: bool,
    #[serde(default)]
    is_header: bool,
}

fn default_true() -> bool {
    true
}

impl From<RawStep> for StepResult {
    fn from(raw: RawStep) -> Self {
        StepResult {
            session: raw.session,
            step: 0,
            description: raw.description,
            query: raw.query,
            result: raw.result,
            success: raw.success,
            is_header: raw.is_header,
        }
    }
}

/// JS prelude shared by every scenario script.
const STEP_FN: &str = "function step(o) { print(JSON.stringify(o)); }\n";

/// Run `script` inside the container and forward each printed step through
/// `sink` as it is produced. Lines that are not step objects (shell banners,
/// stray prints) are skipped.
pub(crate) async fn stream_script(
    shell: &MongoShell,
    script: &str,
    sink: StepSink,
) -> Result<(), ScenarioError> {
    let full = format!("{STEP_FN}{script}");
    stream_command(shell.eval_streamed(&full), sink).await
}

/// Kept stderr stays bounded; only the leading output lands in the error.
const STDERR_KEEP: usize = 8 * 1024;

/// Spawn `cmd` (stdout and stderr piped) and forward each step-shaped stdout
/// line through `sink`. stderr is drained on its own task while stdout is
/// read, since a child writing more stderr than the pipe buffer holds would
/// otherwise block against a full pipe and never finish.
async fn stream_command(mut cmd: Command, mut sink: StepSink) -> Result<(), ScenarioError> {
    let mut child = cmd
        .spawn()
        .map_err(|e| ScenarioError::Run(format!("spawn scenario shell: {e}")))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ScenarioError::Run("scenario stdout not captured".into()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| ScenarioError::Run("scenario stderr not captured".into()))?;

    let stderr_task = tokio::spawn(async move {
        let mut kept = String::new();
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if kept.len() < STDERR_KEEP {
                kept.push_str(&line);
                kept.push('\n');
            }
        }
        kept
    });

    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if !line.starts_with('{') {
            continue;
        }
        match serde_json::from_str::<RawStep>(line) {
            Ok(raw) => sink.emit(raw.into()),
            Err(e) => tracing::debug!(%line, error = %e, "skipping non-step output line"),
        }
    }

    let status = child
        .wait()
        .await
        .map_err(|e| ScenarioError::Run(format!("wait for scenario shell: {e}")))?;
    let stderr_out = stderr_task.await.unwrap_or_default();
    if !status.success() {
        return Err(ScenarioError::Run(format!(
            "scenario script failed: {}",
            stderr_out.trim()
        )));
    }
    Ok(())
}

pub(crate) async fn drop_collection(shell: &MongoShell, collection: &str) -> Result<(), String> {
    shell
        .eval(&format!("db.{collection}.drop()"))
        .await
        .map(|_| ())
        .map_err(|e| format!("drop {collection}: {e:#}"))
}
