//! The dispatcher: sole owner of view state.
//!
//! `update` consumes one message and returns the deferred effects as a
//! [`Cmd`]; it performs no I/O itself. The host loop in `tui::mod` executes
//! commands on workers and feeds their results back in as new messages, so
//! every state mutation happens serially on the UI thread.

use crate::model::{Generation, ProviderError, ScenarioError, StepResult};
use crate::provider::{Provider, Registry};
use crate::scenario::Scenario;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use std::time::Duration;

/// Messages consumed by the dispatcher. Async results carry the generation of
/// the attempt that produced them.
pub enum Msg {
    Key(KeyEvent),
    Resize(u16, u16),
    Tick(Generation),
    ProviderStarted {
        generation: Generation,
        provider: Arc<dyn Provider>,
        result: Result<(), ProviderError>,
    },
    ProviderStopped,
    ScenarioSelected(Arc<dyn Scenario>),
    ScenarioStep {
        generation: Generation,
        step: StepResult,
    },
    ScenarioComplete {
        generation: Generation,
        error: Option<ScenarioError>,
    },
    Quit,
}

/// Deferred effects requested from the host loop. Commands carry capability
/// handles, never shared mutable state.
pub enum Cmd {
    None,
    Batch(Vec<Cmd>),
    /// Deliver `Msg::Tick(generation)` after the delay.
    Tick {
        generation: Generation,
        after: Duration,
    },
    StartProvider {
        generation: Generation,
        provider: Arc<dyn Provider>,
    },
    StopProvider {
        provider: Arc<dyn Provider>,
        /// When set, the host must deliver `Msg::ProviderStopped` so the
        /// dispatcher can release the final `Cmd::Quit`.
        quitting: bool,
    },
    RunScenario {
        generation: Generation,
        scenario: Arc<dyn Scenario>,
    },
    /// Terminate the event loop. Only emitted once all cleanup completed.
    Quit,
}

pub struct MenuState {
    pub cursor: usize,
}

pub const MENU_ITEMS: [&str; 3] = ["Select Database Provider", "Help & About", "Quit"];

pub struct ProviderSelectState {
    pub cursor: usize,
    /// Last start failure, shown inline until the next navigation.
    pub error: Option<String>,
}

pub struct LoadingState {
    pub provider: Arc<dyn Provider>,
    pub generation: Generation,
    pub frame: usize,
}

pub struct ScenarioListState {
    pub scenarios: Vec<Arc<dyn Scenario>>,
    pub cursor: usize,
}

/// Live state of one scenario run. Created fresh per run, discarded when the
/// runner view is left.
pub struct Session {
    pub scenario: Arc<dyn Scenario>,
    pub generation: Generation,
    pub results: Vec<StepResult>,
    pub running: bool,
    pub done: bool,
    pub error: Option<String>,
    pub frame: usize,
    /// Scenario-list cursor to restore on back-navigation.
    list_cursor: usize,
}

pub enum View {
    Menu(MenuState),
    ProviderSelect(ProviderSelectState),
    Loading(LoadingState),
    ScenarioList(ScenarioListState),
    Runner(Session),
    Help,
    Terminated,
}

pub struct App {
    registry: Arc<Registry>,
    view: View,
    /// Ownership slot for the active resource. At most one provider is
    /// started at a time; taking it out of this slot is what authorizes a
    /// Stop command.
    active: Option<Arc<dyn Provider>>,
    generation: Generation,
    tick_interval: Duration,
    /// Start attempts whose result has not arrived yet. Quit waits these out
    /// so a container that finishes starting mid-shutdown still gets stopped.
    starts_in_flight: u32,
    /// Stop commands whose `ProviderStopped` has not arrived yet. Quit waits
    /// these out too, or a back-navigation stop could be dropped unfinished.
    stops_in_flight: u32,
    quitting: bool,
}

impl App {
    pub fn new(registry: Arc<Registry>, tick_interval: Duration) -> Self {
        Self {
            registry,
            view: View::Menu(MenuState { cursor: 0 }),
            active: None,
            generation: Generation::default(),
            tick_interval,
            starts_in_flight: 0,
            stops_in_flight: 0,
            quitting: false,
        }
    }

    pub fn init(&self) -> Cmd {
        Cmd::None
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn is_quitting(&self) -> bool {
        self.quitting
    }

    pub fn active_provider(&self) -> Option<&Arc<dyn Provider>> {
        self.active.as_ref()
    }

    pub fn update(&mut self, msg: Msg) -> Cmd {
        match msg {
            // The render loop redraws every frame; nothing to record.
            Msg::Resize(_, _) => Cmd::None,
            Msg::Key(key) => self.handle_key(key),
            Msg::Tick(generation) => self.handle_tick(generation),
            Msg::ProviderStarted {
                generation,
                provider,
                result,
            } => self.handle_provider_started(generation, provider, result),
            Msg::ProviderStopped => {
                self.stops_in_flight = self.stops_in_flight.saturating_sub(1);
                if self.quitting && self.nothing_in_flight() {
                    Cmd::Quit
                } else {
                    Cmd::None
                }
            }
            Msg::ScenarioSelected(scenario) => self.start_run(scenario),
            Msg::ScenarioStep { generation, step } => {
                if let View::Runner(session) = &mut self.view {
                    if session.generation == generation && session.running {
                        session.results.push(step);
                    } else {
                        tracing::debug!(%generation, "dropping stale scenario step");
                    }
                }
                Cmd::None
            }
            Msg::ScenarioComplete { generation, error } => {
                if let View::Runner(session) = &mut self.view {
                    if session.generation == generation && session.running {
                        session.running = false;
                        session.done = true;
                        session.error = error.map(|e| e.to_string());
                    }
                }
                Cmd::None
            }
            Msg::Quit => self.quit(),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Cmd {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return self.quit();
        }
        match key.code {
            KeyCode::Char('q') => {
                if matches!(self.view, View::Menu(_)) {
                    return self.quit();
                }
                return self.go_back();
            }
            KeyCode::Esc => return self.go_back(),
            _ => {}
        }

        match &mut self.view {
            View::Menu(menu) => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    menu.cursor = menu.cursor.saturating_sub(1);
                    Cmd::None
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    menu.cursor = (menu.cursor + 1).min(MENU_ITEMS.len() - 1);
                    Cmd::None
                }
                KeyCode::Enter => match menu.cursor {
                    0 => {
                        self.view = View::ProviderSelect(ProviderSelectState {
                            cursor: 0,
                            error: None,
                        });
                        Cmd::None
                    }
                    1 => {
                        self.view = View::Help;
                        Cmd::None
                    }
                    _ => self.quit(),
                },
                _ => Cmd::None,
            },
            View::ProviderSelect(list) => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    list.cursor = list.cursor.saturating_sub(1);
                    Cmd::None
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    let max = self.registry.all().len().saturating_sub(1);
                    list.cursor = (list.cursor + 1).min(max);
                    Cmd::None
                }
                KeyCode::Enter => {
                    let selected = self.registry.all().get(list.cursor).cloned();
                    match selected {
                        Some(provider) => self.start_provider(provider),
                        None => Cmd::None,
                    }
                }
                _ => Cmd::None,
            },
            // The loading view reacts only to ticks and start results.
            View::Loading(_) => Cmd::None,
            View::ScenarioList(list) => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    list.cursor = list.cursor.saturating_sub(1);
                    Cmd::None
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    let max = list.scenarios.len().saturating_sub(1);
                    list.cursor = (list.cursor + 1).min(max);
                    Cmd::None
                }
                KeyCode::Enter => match list.scenarios.get(list.cursor).cloned() {
                    Some(scenario) => self.start_run(scenario),
                    None => Cmd::None,
                },
                _ => Cmd::None,
            },
            View::Runner(_) | View::Help | View::Terminated => Cmd::None,
        }
    }

    fn handle_tick(&mut self, generation: Generation) -> Cmd {
        match &mut self.view {
            View::Loading(loading) if loading.generation == generation => {
                loading.frame += 1;
                Cmd::Tick {
                    generation,
                    after: self.tick_interval,
                }
            }
            View::Runner(session) if session.generation == generation && session.running => {
                session.frame += 1;
                Cmd::Tick {
                    generation,
                    after: self.tick_interval,
                }
            }
            // Stale or idle: stop rescheduling so the process goes quiet.
            _ => Cmd::None,
        }
    }

    fn nothing_in_flight(&self) -> bool {
        self.starts_in_flight == 0 && self.stops_in_flight == 0
    }

    /// Every Stop goes through here so `stops_in_flight` stays in step with
    /// the `ProviderStopped` messages the host delivers back.
    fn stop_provider(&mut self, provider: Arc<dyn Provider>, quitting: bool) -> Cmd {
        self.stops_in_flight += 1;
        Cmd::StopProvider { provider, quitting }
    }

    fn handle_provider_started(
        &mut self,
        generation: Generation,
        provider: Arc<dyn Provider>,
        result: Result<(), ProviderError>,
    ) -> Cmd {
        self.starts_in_flight = self.starts_in_flight.saturating_sub(1);
        if self.quitting {
            return match result {
                Ok(()) => self.stop_provider(provider, true),
                Err(_) if self.nothing_in_flight() => Cmd::Quit,
                Err(_) => Cmd::None,
            };
        }

        let current = matches!(&self.view, View::Loading(l) if l.generation == generation);
        if !current {
            // The attempt was abandoned. A failed start needs nothing; a
            // successful one would orphan the resource, so stop it without
            // touching view state.
            return match result {
                Ok(()) => {
                    tracing::info!(%generation, "stopping provider from abandoned start attempt");
                    self.stop_provider(provider, false)
                }
                Err(e) => {
                    tracing::debug!(%generation, error = %e, "dropping stale start failure");
                    Cmd::None
                }
            };
        }

        match result {
            Ok(()) => {
                let scenarios = provider.scenarios();
                self.active = Some(provider);
                self.view = View::ScenarioList(ScenarioListState {
                    scenarios,
                    cursor: 0,
                });
            }
            Err(e) => {
                self.view = View::ProviderSelect(ProviderSelectState {
                    cursor: 0,
                    error: Some(e.to_string()),
                });
            }
        }
        Cmd::None
    }

    fn start_provider(&mut self, provider: Arc<dyn Provider>) -> Cmd {
        let generation = self.generation.bump();
        self.starts_in_flight += 1;
        self.view = View::Loading(LoadingState {
            provider: provider.clone(),
            generation,
            frame: 0,
        });
        Cmd::Batch(vec![
            Cmd::StartProvider {
                generation,
                provider,
            },
            Cmd::Tick {
                generation,
                after: self.tick_interval,
            },
        ])
    }

    fn start_run(&mut self, scenario: Arc<dyn Scenario>) -> Cmd {
        let list_cursor = match &self.view {
            View::ScenarioList(list) => list.cursor,
            _ => 0,
        };
        let generation = self.generation.bump();
        self.view = View::Runner(Session {
            scenario: scenario.clone(),
            generation,
            results: Vec::new(),
            running: true,
            done: false,
            error: None,
            frame: 0,
            list_cursor,
        });
        Cmd::Batch(vec![
            Cmd::RunScenario {
                generation,
                scenario,
            },
            Cmd::Tick {
                generation,
                after: self.tick_interval,
            },
        ])
    }

    /// Back-navigation. Always clears view-local error state; leaving the
    /// scenario list releases the active provider.
    fn go_back(&mut self) -> Cmd {
        match &self.view {
            View::Menu(_) | View::Terminated => Cmd::None,
            View::ProviderSelect(_) | View::Help => {
                self.view = View::Menu(MenuState { cursor: 0 });
                Cmd::None
            }
            View::Loading(_) => {
                // Abandon interest; a late ProviderStarted for this attempt
                // is dropped (or stopped) via its generation tag.
                self.view = View::ProviderSelect(ProviderSelectState {
                    cursor: 0,
                    error: None,
                });
                Cmd::None
            }
            View::ScenarioList(_) => {
                self.view = View::ProviderSelect(ProviderSelectState {
                    cursor: 0,
                    error: None,
                });
                match self.active.take() {
                    Some(provider) => self.stop_provider(provider, false),
                    None => Cmd::None,
                }
            }
            View::Runner(session) => {
                let cursor = session.list_cursor;
                let scenarios = self
                    .active
                    .as_ref()
                    .map(|p| p.scenarios())
                    .unwrap_or_default();
                self.view = View::ScenarioList(ScenarioListState {
                    cursor: cursor.min(scenarios.len().saturating_sub(1)),
                    scenarios,
                });
                Cmd::None
            }
        }
    }

    /// Termination sequence: the final `Cmd::Quit` is withheld until every
    /// in-flight start and stop has reported back.
    fn quit(&mut self) -> Cmd {
        self.quitting = true;
        self.view = View::Terminated;
        if let Some(provider) = self.active.take() {
            return self.stop_provider(provider, true);
        }
        if !self.nothing_in_flight() {
            // Pending starts resolve into stop-then-quit; pending stops
            // release the exit when their ProviderStopped arrives.
            return Cmd::None;
        }
        Cmd::Quit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        starts: AtomicUsize,
        stops: AtomicUsize,
    }

    impl CountingProvider {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                starts: AtomicUsize::new(0),
                stops: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Provider for CountingProvider {
        fn name(&self) -> &str {
            "Counting"
        }
        fn description(&self) -> &str {
            "test provider"
        }
        async fn start(&self) -> Result<(), ProviderError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn stop(&self) -> Result<(), ProviderError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn is_running(&self) -> bool {
            false
        }
        fn connection_info(&self) -> String {
            "test".into()
        }
        fn scenarios(&self) -> Vec<Arc<dyn Scenario>> {
            vec![Arc::new(crate::scenario::tests::MockScenario { name: "mock" })]
        }
    }

    fn app_with_provider() -> (App, Arc<CountingProvider>) {
        let provider = CountingProvider::new();
        let mut registry = Registry::new();
        registry.register(provider.clone());
        (
            App::new(Arc::new(registry), Duration::from_millis(100)),
            provider,
        )
    }

    fn key(code: KeyCode) -> Msg {
        Msg::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl_c() -> Msg {
        Msg::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL))
    }

    /// Count Stop commands in a command tree.
    fn stop_count(cmd: &Cmd) -> usize {
        match cmd {
            Cmd::StopProvider { .. } => 1,
            Cmd::Batch(cmds) => cmds.iter().map(stop_count).sum(),
            _ => 0,
        }
    }

    fn drive_to_loading(app: &mut App) -> (Generation, Arc<dyn Provider>) {
        app.update(key(KeyCode::Enter)); // menu -> provider select
        let cmd = app.update(key(KeyCode::Enter)); // confirm provider
        let mut generation = None;
        let mut provider = None;
        if let Cmd::Batch(cmds) = cmd {
            for c in cmds {
                if let Cmd::StartProvider {
                    generation: g,
                    provider: p,
                } = c
                {
                    generation = Some(g);
                    provider = Some(p);
                }
            }
        }
        (generation.expect("start command"), provider.expect("provider"))
    }

    fn drive_to_scenario_list(app: &mut App) -> Generation {
        let (generation, provider) = drive_to_loading(app);
        app.update(Msg::ProviderStarted {
            generation,
            provider,
            result: Ok(()),
        });
        assert!(matches!(app.view(), View::ScenarioList(_)));
        generation
    }

    #[test]
    fn menu_routes_to_provider_select_help_and_quit() {
        let (mut app, _) = app_with_provider();
        app.update(key(KeyCode::Enter));
        assert!(matches!(app.view(), View::ProviderSelect(_)));

        app.update(key(KeyCode::Esc));
        app.update(key(KeyCode::Down));
        app.update(key(KeyCode::Enter));
        assert!(matches!(app.view(), View::Help));

        app.update(key(KeyCode::Esc));
        app.update(key(KeyCode::Down));
        app.update(key(KeyCode::Down));
        let cmd = app.update(key(KeyCode::Enter));
        assert!(matches!(app.view(), View::Terminated));
        assert!(matches!(cmd, Cmd::Quit), "no provider started, quit is immediate");
    }

    #[test]
    fn confirm_provider_emits_start_and_tick() {
        let (mut app, _) = app_with_provider();
        app.update(key(KeyCode::Enter));
        let cmd = app.update(key(KeyCode::Enter));
        let Cmd::Batch(cmds) = cmd else {
            panic!("expected batch of start + tick");
        };
        assert!(matches!(app.view(), View::Loading(_)));
        assert!(cmds.iter().any(|c| matches!(c, Cmd::StartProvider { .. })));
        assert!(cmds.iter().any(|c| matches!(c, Cmd::Tick { .. })));
    }

    #[test]
    fn back_from_scenario_list_stops_provider_exactly_once() {
        let (mut app, _) = app_with_provider();
        drive_to_scenario_list(&mut app);

        let cmd = app.update(key(KeyCode::Esc));
        assert_eq!(stop_count(&cmd), 1);
        assert!(matches!(app.view(), View::ProviderSelect(_)));

        // The ownership slot is empty now: further backs emit no Stop.
        let cmd = app.update(key(KeyCode::Esc));
        assert_eq!(stop_count(&cmd), 0);
        assert!(matches!(app.view(), View::Menu(_)));
    }

    #[test]
    fn back_from_provider_select_without_start_emits_no_stop() {
        let (mut app, _) = app_with_provider();
        app.update(key(KeyCode::Enter));
        let cmd = app.update(key(KeyCode::Esc));
        assert_eq!(stop_count(&cmd), 0);
        assert!(matches!(app.view(), View::Menu(_)));
    }

    #[test]
    fn quit_with_active_provider_waits_for_stopped_message() {
        let (mut app, _) = app_with_provider();
        drive_to_scenario_list(&mut app);

        let cmd = app.update(ctrl_c());
        assert!(matches!(
            cmd,
            Cmd::StopProvider { quitting: true, .. }
        ));
        assert!(app.is_quitting());

        let cmd = app.update(Msg::ProviderStopped);
        assert!(matches!(cmd, Cmd::Quit));
    }

    #[test]
    fn quit_while_a_back_navigation_stop_is_in_flight_waits_for_it() {
        let (mut app, _) = app_with_provider();
        drive_to_scenario_list(&mut app);

        // Back out of the scenario list: one non-quitting Stop goes out.
        let cmd = app.update(key(KeyCode::Esc));
        assert_eq!(stop_count(&cmd), 1);

        // Quitting before that stop reports back must not exit yet, or the
        // container removal would be abandoned mid-flight.
        let cmd = app.update(Msg::Quit);
        assert!(matches!(cmd, Cmd::None));
        assert!(matches!(app.view(), View::Terminated));

        let cmd = app.update(Msg::ProviderStopped);
        assert!(matches!(cmd, Cmd::Quit));
    }

    #[test]
    fn quit_during_loading_waits_for_the_start_then_stops() {
        let (mut app, _) = app_with_provider();
        let (generation, provider) = drive_to_loading(&mut app);

        let cmd = app.update(ctrl_c());
        assert!(
            matches!(cmd, Cmd::None),
            "exit is withheld while a start is in flight"
        );
        assert!(matches!(app.view(), View::Terminated));

        let cmd = app.update(Msg::ProviderStarted {
            generation,
            provider,
            result: Ok(()),
        });
        assert!(matches!(cmd, Cmd::StopProvider { quitting: true, .. }));

        let cmd = app.update(Msg::ProviderStopped);
        assert!(matches!(cmd, Cmd::Quit));
    }

    #[test]
    fn quit_during_loading_with_failed_start_just_exits() {
        let (mut app, _) = app_with_provider();
        let (generation, provider) = drive_to_loading(&mut app);

        app.update(ctrl_c());
        let cmd = app.update(Msg::ProviderStarted {
            generation,
            provider,
            result: Err(ProviderError::start("Counting", "no docker")),
        });
        assert!(matches!(cmd, Cmd::Quit));
    }

    #[test]
    fn stale_start_success_is_stopped_not_applied() {
        let (mut app, _) = app_with_provider();
        let (generation, provider) = drive_to_loading(&mut app);

        // Abandon the attempt before the result arrives.
        app.update(key(KeyCode::Esc));
        assert!(matches!(app.view(), View::ProviderSelect(_)));

        let cmd = app.update(Msg::ProviderStarted {
            generation,
            provider,
            result: Ok(()),
        });
        assert!(matches!(cmd, Cmd::StopProvider { quitting: false, .. }));
        assert!(
            matches!(app.view(), View::ProviderSelect(_)),
            "stale result must not change the view"
        );
        assert!(app.active_provider().is_none());
    }

    #[test]
    fn stale_start_failure_is_dropped() {
        let (mut app, _) = app_with_provider();
        let (generation, provider) = drive_to_loading(&mut app);
        app.update(key(KeyCode::Esc));

        let cmd = app.update(Msg::ProviderStarted {
            generation,
            provider,
            result: Err(ProviderError::start("Counting", "late failure")),
        });
        assert!(matches!(cmd, Cmd::None));
        if let View::ProviderSelect(list) = app.view() {
            assert!(list.error.is_none(), "stale errors never surface");
        } else {
            panic!("expected provider select view");
        }
    }

    #[test]
    fn start_failure_returns_to_selection_with_error_and_back_clears_it() {
        let (mut app, _) = app_with_provider();
        let (generation, provider) = drive_to_loading(&mut app);

        app.update(Msg::ProviderStarted {
            generation,
            provider,
            result: Err(ProviderError::start("Counting", "no docker")),
        });
        match app.view() {
            View::ProviderSelect(list) => {
                assert!(list.error.as_deref().unwrap().contains("no docker"));
            }
            _ => panic!("expected provider select view"),
        }

        app.update(key(KeyCode::Esc));
        app.update(key(KeyCode::Enter));
        match app.view() {
            View::ProviderSelect(list) => assert!(list.error.is_none()),
            _ => panic!("expected provider select view"),
        }
    }

    #[test]
    fn session_records_steps_in_order_and_completes_once() {
        let (mut app, _) = app_with_provider();
        drive_to_scenario_list(&mut app);
        let cmd = app.update(key(KeyCode::Enter));
        let generation = match cmd {
            Cmd::Batch(cmds) => cmds
                .into_iter()
                .find_map(|c| match c {
                    Cmd::RunScenario { generation, .. } => Some(generation),
                    _ => None,
                })
                .expect("run command"),
            _ => panic!("expected batch"),
        };

        for desc in ["one", "two"] {
            let mut step = StepResult::header(desc);
            step.is_header = false;
            app.update(Msg::ScenarioStep {
                generation,
                step,
            });
        }
        app.update(Msg::ScenarioComplete {
            generation,
            error: None,
        });

        // Steps after completion are dropped for this generation.
        app.update(Msg::ScenarioStep {
            generation,
            step: StepResult::header("late"),
        });

        match app.view() {
            View::Runner(session) => {
                assert_eq!(session.results.len(), 2);
                assert_eq!(session.results[0].description, "one");
                assert_eq!(session.results[1].description, "two");
                assert!(!session.running);
                assert!(session.done);
                assert!(session.error.is_none());
            }
            _ => panic!("expected runner view"),
        }
    }

    #[test]
    fn steps_from_a_superseded_generation_change_nothing() {
        let (mut app, _) = app_with_provider();
        drive_to_scenario_list(&mut app);
        app.update(key(KeyCode::Enter));

        // Leave the runner and start a second run: new generation.
        app.update(key(KeyCode::Esc));
        let cmd = app.update(key(KeyCode::Enter));
        let new_generation = match cmd {
            Cmd::Batch(cmds) => cmds
                .into_iter()
                .find_map(|c| match c {
                    Cmd::RunScenario { generation, .. } => Some(generation),
                    _ => None,
                })
                .expect("run command"),
            _ => panic!("expected batch"),
        };

        let mut old = Generation::default();
        let stale = old.bump(); // generation of some prior attempt
        assert_ne!(stale, new_generation);
        app.update(Msg::ScenarioStep {
            generation: stale,
            step: StepResult::header("stale"),
        });

        match app.view() {
            View::Runner(session) => assert!(session.results.is_empty()),
            _ => panic!("expected runner view"),
        }
    }

    #[test]
    fn ticks_reschedule_only_while_animating() {
        let (mut app, _) = app_with_provider();
        drive_to_scenario_list(&mut app);
        let cmd = app.update(key(KeyCode::Enter));
        let generation = match cmd {
            Cmd::Batch(cmds) => cmds
                .into_iter()
                .find_map(|c| match c {
                    Cmd::Tick { generation, .. } => Some(generation),
                    _ => None,
                })
                .expect("tick command"),
            _ => panic!("expected batch"),
        };

        assert!(matches!(app.update(Msg::Tick(generation)), Cmd::Tick { .. }));

        app.update(Msg::ScenarioComplete {
            generation,
            error: None,
        });
        // Within one interval of running turning false, the chain stops.
        assert!(matches!(app.update(Msg::Tick(generation)), Cmd::None));

        let mut old = Generation::default();
        let stale = old.bump();
        assert!(matches!(app.update(Msg::Tick(stale)), Cmd::None));
    }
}
