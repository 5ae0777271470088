//! Database provider capability.
//!
//! A provider owns one external stateful resource (a containerized database)
//! and the set of scenarios that can run against it. Handles are shared as
//! `Arc<dyn Provider>`; the UI thread holds the ownership slot, workers only
//! hold clones for the duration of a start/stop/run.

pub mod docker;
pub mod mongo;

use crate::model::ProviderError;
use crate::scenario::Scenario;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Short display name, e.g. "MongoDB".
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Start the backing resource. Safe to call on an already-running
    /// provider (no-op).
    async fn start(&self) -> Result<(), ProviderError>;

    /// Stop the backing resource. Idempotent: safe on a never-started or
    /// already-stopped provider.
    async fn stop(&self) -> Result<(), ProviderError>;

    fn is_running(&self) -> bool;

    /// Connection details for display. Meaningful only while running.
    fn connection_info(&self) -> String;

    /// Scenarios available against this provider, in display order.
    fn scenarios(&self) -> Vec<Arc<dyn Scenario>>;
}

/// Ordered set of registered providers, resolved by name at composition time.
#[derive(Default)]
pub struct Registry {
    providers: Vec<Arc<dyn Provider>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.push(provider);
    }

    pub fn all(&self) -> &[Arc<dyn Provider>] {
        &self.providers
    }

    pub fn by_name(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario;

    struct FakeProvider {
        name: &'static str,
    }

    #[async_trait]
    impl Provider for FakeProvider {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "fake"
        }
        async fn start(&self) -> Result<(), ProviderError> {
            Ok(())
        }
        async fn stop(&self) -> Result<(), ProviderError> {
            Ok(())
        }
        fn is_running(&self) -> bool {
            false
        }
        fn connection_info(&self) -> String {
            "not connected".into()
        }
        fn scenarios(&self) -> Vec<Arc<dyn scenario::Scenario>> {
            Vec::new()
        }
    }

    #[test]
    fn by_name_is_case_insensitive() {
        let mut r = Registry::new();
        r.register(Arc::new(FakeProvider { name: "MongoDB" }));
        assert!(r.by_name("mongodb").is_some());
        assert!(r.by_name("postgres").is_none());
        assert_eq!(r.all().len(), 1);
    }
}
