use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Monotonic tag distinguishing successive provider attempts and scenario
/// runs. Async results carry the generation that spawned them; the dispatcher
/// drops anything tagged with a superseded generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Generation(u64);

impl Generation {
    /// Advance to the next generation, invalidating all in-flight results
    /// tagged with the current one.
    pub fn bump(&mut self) -> Generation {
        self.0 += 1;
        *self
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// One recorded step of a scenario run. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    /// Which session/transaction the step belongs to ("Session A", "Setup", …).
    pub session: String,
    /// 1-based position within the run; 0 for section headers.
    pub step: u32,
    pub description: String,
    /// The operation being performed, shell syntax.
    pub query: String,
    /// The observed outcome.
    pub result: String,
    pub success: bool,
    /// Section headers carry only a description.
    pub is_header: bool,
}

impl StepResult {
    pub fn header(description: impl Into<String>) -> Self {
        Self {
            session: String::new(),
            step: 0,
            description: description.into(),
            query: String::new(),
            result: String::new(),
            success: true,
            is_header: true,
        }
    }
}

/// Errors surfaced when starting or stopping a database provider.
///
/// Start failures are recoverable: the UI shows them inline and returns to
/// provider selection. Stop failures are best-effort and only logged.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("failed to start {name}: {reason}")]
    Start { name: String, reason: String },
    #[error("failed to stop {name}: {reason}")]
    Stop { name: String, reason: String },
}

impl ProviderError {
    pub fn start(name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Start {
            name: name.into(),
            reason: format!("{reason:#}"),
        }
    }

    pub fn stop(name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Stop {
            name: name.into(),
            reason: format!("{reason:#}"),
        }
    }
}

/// Errors surfaced by a scenario run. All of these are recoverable: the run
/// view shows them and the session is marked done.
#[derive(Debug, Clone, Error)]
pub enum ScenarioError {
    #[error("setup failed: {0}")]
    Setup(String),
    #[error("{0}")]
    Run(String),
    #[error("cleanup failed: {0}")]
    Cleanup(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_bump_is_monotonic() {
        let mut g = Generation::default();
        let a = g.bump();
        let b = g.bump();
        assert_ne!(a, b);
        assert_eq!(g, b);
        assert_ne!(g, a);
    }

    #[test]
    fn header_steps_carry_no_index() {
        let h = StepResult::header("Phase one");
        assert!(h.is_header);
        assert_eq!(h.step, 0);
        assert!(h.query.is_empty());
    }
}
