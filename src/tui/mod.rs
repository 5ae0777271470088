mod app;
mod theme;
mod views;

use crate::cli::Cli;
use crate::provider::Registry;
use crate::runner::{self, RunEvent};
use anyhow::{Context, Result};
use app::{App, Cmd, Msg};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::sync::Arc;
use std::time::{Duration, Instant};
use std::{io, thread};
use theme::Theme;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub async fn run(args: &Cli, registry: Arc<Registry>) -> Result<()> {
    // Unbounded channel keeps the dispatcher loop free of backpressure.
    let (msg_tx, msg_rx) = mpsc::unbounded_channel::<Msg>();

    // All terminal I/O lives on a dedicated thread; workers run on the Tokio
    // runtime and report back through the channel.
    let handle = Handle::current();
    let tick_interval = Duration::from(args.tick_rate);
    let ui_handle =
        thread::spawn(move || run_threaded(registry, tick_interval, msg_rx, msg_tx, handle));

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    match join_res {
        Ok(Ok(res)) => res,
        Ok(Err(_)) | Err(_) => Err(anyhow::anyhow!("TUI thread panicked")),
    }
}

/// Run the dispatcher loop on a dedicated thread. Input, ticks and worker
/// results all funnel through `update`; the loop ends when a command tree
/// contains `Cmd::Quit`.
fn run_threaded(
    registry: Arc<Registry>,
    tick_interval: Duration,
    mut msg_rx: UnboundedReceiver<Msg>,
    msg_tx: UnboundedSender<Msg>,
    rt: Handle,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let theme = Theme::default();
    let mut app = App::new(registry, tick_interval);
    dispatch(app.init(), &rt, &msg_tx);

    let render_rate = Duration::from_millis(100);
    let mut last_render = Instant::now();

    let res = 'outer: loop {
        // Drain worker messages without blocking.
        while let Ok(msg) = msg_rx.try_recv() {
            let cmd = app.update(msg);
            if dispatch(cmd, &rt, &msg_tx) {
                break 'outer Ok(());
            }
        }

        if last_render.elapsed() >= render_rate {
            terminal.draw(|f| views::draw(f, &app, &theme)).ok();
            last_render = Instant::now();
        }

        // Short poll keeps the render loop responsive.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(ev) = event::read() {
                let msg = match ev {
                    Event::Key(k) if k.kind == KeyEventKind::Press => Some(Msg::Key(k)),
                    Event::Resize(w, h) => Some(Msg::Resize(w, h)),
                    _ => None,
                };
                if let Some(msg) = msg {
                    let cmd = app.update(msg);
                    if dispatch(cmd, &rt, &msg_tx) {
                        break Ok(());
                    }
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

/// Execute one command tree, spawning workers on the runtime. Returns true
/// when the loop should terminate.
fn dispatch(cmd: Cmd, rt: &Handle, tx: &UnboundedSender<Msg>) -> bool {
    match cmd {
        Cmd::None => false,
        Cmd::Quit => true,
        Cmd::Batch(cmds) => {
            let mut quit = false;
            for c in cmds {
                quit |= dispatch(c, rt, tx);
            }
            quit
        }
        Cmd::Tick { generation, after } => {
            let tx = tx.clone();
            rt.spawn(async move {
                tokio::time::sleep(after).await;
                let _ = tx.send(Msg::Tick(generation));
            });
            false
        }
        Cmd::StartProvider {
            generation,
            provider,
        } => {
            let tx = tx.clone();
            rt.spawn(async move {
                tracing::info!(provider = provider.name(), %generation, "starting provider");
                let result = provider.start().await;
                if let Err(e) = &result {
                    tracing::warn!(provider = provider.name(), error = %e, "provider start failed");
                }
                let _ = tx.send(Msg::ProviderStarted {
                    generation,
                    provider,
                    result,
                });
            });
            false
        }
        Cmd::StopProvider { provider, quitting } => {
            let tx = tx.clone();
            rt.spawn(async move {
                tracing::info!(provider = provider.name(), quitting, "stopping provider");
                // Stop failures are best-effort: log and move on.
                if let Err(e) = provider.stop().await {
                    tracing::warn!(provider = provider.name(), error = %e, "provider stop failed");
                }
                let _ = tx.send(Msg::ProviderStopped);
            });
            false
        }
        Cmd::RunScenario {
            generation,
            scenario,
        } => {
            let tx = tx.clone();
            rt.spawn(async move {
                tracing::info!(scenario = scenario.name(), %generation, "running scenario");
                let (ev_tx, mut ev_rx) = mpsc::unbounded_channel();
                let run = tokio::spawn(runner::run_scenario(scenario, ev_tx));
                while let Some(ev) = ev_rx.recv().await {
                    let msg = match ev {
                        RunEvent::Step(step) => Msg::ScenarioStep { generation, step },
                        RunEvent::Completed { error } => {
                            Msg::ScenarioComplete { generation, error }
                        }
                    };
                    if tx.send(msg).is_err() {
                        break;
                    }
                }
                let _ = run.await;
            });
            false
        }
    }
}
