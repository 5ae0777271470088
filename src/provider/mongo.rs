//! MongoDB 7.0 provider: a single-node replica set in a Docker container.
//!
//! Multi-document transactions require a replica set, so startup initiates
//! `rs0` and waits for the node to become the writable primary before the
//! provider reports ready. Scenarios talk to the database through
//! [`MongoShell`], which runs `mongosh` inside the container.

use crate::model::ProviderError;
use crate::provider::docker::Container;
use crate::provider::Provider;
use crate::scenario::{self, Scenario};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

const CONTAINER_NAME: &str = "txdemo-mongo";
const IMAGE: &str = "mongo:7.0";
const DB_URI: &str = "mongodb://localhost:27017/txdemo";

/// Readiness polling: one-second intervals, generous ceiling for first image
/// pulls on slow links.
const READY_ATTEMPTS: u32 = 90;

pub struct MongoProvider {
    container: Arc<Container>,
}

impl MongoProvider {
    pub fn new() -> Self {
        Self {
            container: Arc::new(
                Container::new(CONTAINER_NAME, IMAGE).with_command([
                    "mongod",
                    "--replSet",
                    "rs0",
                    "--bind_ip_all",
                ]),
            ),
        }
    }

    pub fn shell(&self) -> MongoShell {
        MongoShell {
            container: self.container.clone(),
        }
    }

    async fn wait_until_ready(&self) -> Result<()> {
        for attempt in 1..=READY_ATTEMPTS {
            match self
                .container
                .exec([
                    "mongosh",
                    "--quiet",
                    "--norc",
                    "--eval",
                    "db.runCommand({ ping: 1 }).ok",
                ])
                .await
            {
                Ok(out) if out.trim() == "1" => return Ok(()),
                Ok(_) | Err(_) if attempt < READY_ATTEMPTS => {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
                Ok(out) => bail!("mongod not answering pings (last output: {out})"),
                Err(e) => return Err(e).context("mongod never became reachable"),
            }
        }
        unreachable!("loop returns or bails on the last attempt")
    }

    async fn init_replica_set(&self) -> Result<()> {
        self.container
            .exec([
                "mongosh",
                "--quiet",
                "--norc",
                "--eval",
                "try { rs.status() } catch (e) { rs.initiate() }",
            ])
            .await
            .context("initiate replica set")?;

        // Transactions need a writable primary, not just an initiated set.
        for attempt in 1..=READY_ATTEMPTS {
            let out = self
                .container
                .exec([
                    "mongosh",
                    "--quiet",
                    "--norc",
                    "--eval",
                    "db.hello().isWritablePrimary",
                ])
                .await
                .unwrap_or_default();
            if out.trim() == "true" {
                return Ok(());
            }
            if attempt < READY_ATTEMPTS {
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
        bail!("replica set never elected a primary")
    }
}

impl Default for MongoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MongoProvider {
    fn name(&self) -> &str {
        "MongoDB"
    }

    fn description(&self) -> &str {
        "MongoDB 7.0 with replica set for multi-document transaction support"
    }

    async fn start(&self) -> Result<(), ProviderError> {
        let result = async {
            self.container.start().await?;
            self.wait_until_ready().await?;
            self.init_replica_set().await
        }
        .await;

        if let Err(e) = result {
            // Leave no half-started container behind a failed attempt.
            let _ = self.container.stop().await;
            return Err(ProviderError::start(self.name(), e));
        }
        tracing::info!(container = CONTAINER_NAME, "mongodb provider started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        self.container
            .stop()
            .await
            .map_err(|e| ProviderError::stop(self.name(), e))?;
        tracing::info!(container = CONTAINER_NAME, "mongodb provider stopped");
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.container.is_running()
    }

    fn connection_info(&self) -> String {
        if self.is_running() {
            format!("{DB_URI}?replicaSet=rs0 (container {CONTAINER_NAME})")
        } else {
            "Not connected".into()
        }
    }

    fn scenarios(&self) -> Vec<Arc<dyn Scenario>> {
        scenario::mongo::all(self.shell())
    }
}

/// Thin handle for running `mongosh` against the provider's database.
/// Cloned freely into workers; the container itself stays owned by the
/// provider.
#[derive(Clone)]
pub struct MongoShell {
    container: Arc<Container>,
}

impl MongoShell {
    /// Evaluate a script and return its printed output.
    pub async fn eval(&self, script: &str) -> Result<String> {
        self.container
            .exec(["mongosh", "--quiet", "--norc", "--eval", script, DB_URI])
            .await
    }

    /// Build a command evaluating `script` with piped stdout so callers can
    /// consume output line by line while the script is still running.
    pub fn eval_streamed(&self, script: &str) -> Command {
        self.container
            .exec_streamed(["mongosh", "--quiet", "--norc", "--eval", script, DB_URI])
    }
}
