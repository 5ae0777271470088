//! Container lifecycle driven through the `docker` CLI.
//!
//! Start/stop shells out to `docker` with `tokio::process`; no daemon API
//! client is linked in. `stop` is idempotent and `start` is a no-op on an
//! already-running container.

use anyhow::{bail, Context, Result};
use std::ffi::OsStr;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::process::Command;

pub struct Container {
    name: String,
    image: String,
    run_args: Vec<String>,
    command: Vec<String>,
    running: AtomicBool,
}

impl Container {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            run_args: Vec::new(),
            command: Vec::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Extra arguments for `docker run` (ports, env, …).
    pub fn with_run_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Command executed inside the container.
    pub fn with_command<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn start(&self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        // A leftover container from a crashed run would collide on the name.
        let _ = docker(["rm", "-f", self.name.as_str()]).await;

        let mut args: Vec<String> = vec![
            "run".into(),
            "-d".into(),
            "--rm".into(),
            "--name".into(),
            self.name.clone(),
        ];
        args.extend(self.run_args.iter().cloned());
        args.push(self.image.clone());
        args.extend(self.command.iter().cloned());

        docker(args)
            .await
            .with_context(|| format!("start container {}", self.name))?;
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        docker(["rm", "-f", self.name.as_str()])
            .await
            .map(|_| ())
            .with_context(|| format!("remove container {}", self.name))
    }

    /// Run a command inside the container and return its stdout.
    pub async fn exec<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut full: Vec<String> = vec!["exec".into(), self.name.clone()];
        full.extend(args.into_iter().map(Into::into));
        docker(full).await
    }

    /// Build a `docker exec` command with piped stdout for line-by-line
    /// streaming. The caller spawns and drives it.
    pub fn exec_streamed<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new("docker");
        cmd.arg("exec")
            .arg(&self.name)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

async fn docker<I, S>(args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<std::ffi::OsString> = args.into_iter().map(|a| a.as_ref().into()).collect();
    let display: String = args
        .iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");

    let out = Command::new("docker")
        .args(&args)
        .stdin(Stdio::null())
        .output()
        .await
        .context("invoke docker (is Docker installed and on PATH?)")?;

    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr);
        bail!("docker {display} failed: {}", stderr.trim());
    }
    Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stop_on_never_started_container_is_a_noop() {
        let c = Container::new("txdemo-test-noop", "scratch");
        assert!(!c.is_running());
        // Must not touch docker at all when nothing was started.
        c.stop().await.expect("idempotent stop");
        c.stop().await.expect("second stop");
        assert!(!c.is_running());
    }

    #[test]
    fn builder_keeps_run_args_and_command_in_order() {
        let c = Container::new("n", "img")
            .with_run_args(["-p", "27017:27017"])
            .with_command(["mongod", "--replSet", "rs0"]);
        assert_eq!(c.run_args, vec!["-p", "27017:27017"]);
        assert_eq!(c.command, vec!["mongod", "--replSet", "rs0"]);
    }
}
