use crate::model::StepResult;
use crate::provider::{mongo::MongoProvider, Registry};
use crate::runner::{self, RunEvent};
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "txdemo",
    version,
    about = "Interactive demonstration of database transaction isolation levels"
)]
pub struct Cli {
    /// List providers and their scenarios, then exit (no TUI)
    #[arg(long)]
    pub list: bool,

    /// Run one scenario to completion and exit (no TUI)
    #[arg(long, value_name = "SCENARIO")]
    pub run: Option<String>,

    /// Database provider to run against
    #[arg(long, default_value = "MongoDB")]
    pub provider: String,

    /// Print each step as a JSON line (with --run)
    #[arg(long)]
    pub json: bool,

    /// Animation tick interval
    #[arg(long, default_value = "100ms")]
    pub tick_rate: humantime::Duration,

    /// Log file path (defaults to the platform state directory)
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
}

/// All available providers. Composition happens here, once.
pub fn build_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register(Arc::new(MongoProvider::new()));
    registry
}

pub async fn run(args: Cli) -> Result<()> {
    if args.json && args.run.is_none() {
        return Err(anyhow!("--json only applies to --run"));
    }

    let registry = Arc::new(build_registry());

    if args.list {
        return list(&registry);
    }
    if let Some(name) = args.run.clone() {
        return run_headless(&args, &registry, &name).await;
    }

    #[cfg(feature = "tui")]
    {
        crate::tui::run(&args, registry).await
    }
    #[cfg(not(feature = "tui"))]
    {
        Err(anyhow!("built without TUI support; use --list or --run"))
    }
}

fn list(registry: &Registry) -> Result<()> {
    for provider in registry.all() {
        println!("{}: {}", provider.name(), provider.description());
        for scenario in provider.scenarios() {
            println!("  {} ({})", scenario.name(), scenario.isolation_level());
        }
    }
    Ok(())
}

/// Run one scenario without the TUI, printing steps as they stream in. The
/// provider is stopped before returning, run error or not.
async fn run_headless(args: &Cli, registry: &Registry, name: &str) -> Result<()> {
    let provider = registry
        .by_name(&args.provider)
        .ok_or_else(|| anyhow!("unknown provider '{}' (see --list)", args.provider))?;
    let scenario = provider
        .scenarios()
        .iter()
        .find(|s| s.name().eq_ignore_ascii_case(name))
        .cloned()
        .ok_or_else(|| anyhow!("unknown scenario '{name}' (see --list)"))?;

    eprintln!("Starting {}…", provider.name());
    provider.start().await?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let pipeline = tokio::spawn(runner::run_scenario(scenario, tx));

    let mut run_error = None;
    let mut interrupted = false;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                interrupted = true;
                break;
            }
            ev = rx.recv() => match ev {
                Some(RunEvent::Step(step)) => print_step(&step, args.json)?,
                Some(RunEvent::Completed { error }) => run_error = error,
                None => break,
            }
        }
    }
    pipeline.abort();
    let _ = pipeline.await;

    if let Err(e) = provider.stop().await {
        tracing::warn!(provider = provider.name(), error = %e, "provider stop failed");
    }

    if interrupted {
        return Err(anyhow!("interrupted"));
    }
    match run_error {
        Some(e) => Err(anyhow::Error::from(e)),
        None => Ok(()),
    }
}

fn print_step(step: &StepResult, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string(step).context("serialize step")?
        );
        return Ok(());
    }
    if step.is_header {
        println!();
        println!("== {}", step.description);
        return Ok(());
    }
    println!("{:>2}. [{}] {}", step.step, step.session, step.description);
    if !step.query.is_empty() {
        println!("      ▸ {}", step.query);
    }
    if !step.result.is_empty() {
        let mark = if step.success { "→" } else { "✗" };
        println!("      {} {}", mark, step.result);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_includes_mongodb_with_scenarios() {
        let registry = build_registry();
        let mongo = registry.by_name("mongodb").expect("MongoDB registered");
        assert_eq!(mongo.scenarios().len(), 4);
    }

    #[test]
    fn cli_defaults_parse() {
        let args = Cli::parse_from(["txdemo"]);
        assert!(!args.list);
        assert!(args.run.is_none());
        assert_eq!(args.provider, "MongoDB");
        assert_eq!(std::time::Duration::from(args.tick_rate).as_millis(), 100);
    }

    #[test]
    fn run_flag_takes_a_scenario_name() {
        let args = Cli::parse_from(["txdemo", "--run", "Snapshot Isolation", "--json"]);
        assert_eq!(args.run.as_deref(), Some("Snapshot Isolation"));
        assert!(args.json);
    }
}
