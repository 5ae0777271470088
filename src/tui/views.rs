//! View rendering. Pure functions from dispatcher state to widgets; no view
//! ever mutates anything.

use super::app::{App, LoadingState, ProviderSelectState, ScenarioListState, Session, View, MENU_ITEMS};
use super::theme::Theme;
use crate::model::StepResult;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Rotated on the loading screen while the container comes up.
const LOADING_TIPS: [&str; 5] = [
    "Transactions need a replica set: standalone mongod instances reject them",
    "readConcern: snapshot pins every read to the transaction's start time",
    "Write conflicts abort the second writer instead of losing an update",
    "readConcern: majority only returns data acknowledged by most members",
    "endSession() releases server-side transaction resources",
];

pub fn draw(f: &mut Frame, app: &App, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)].as_ref())
        .split(f.area());

    let title = Paragraph::new(Line::from(vec![Span::styled(
        "txdemo - database transaction isolation, live",
        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
    )]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    match app.view() {
        View::Menu(menu) => draw_menu(f, chunks[1], menu.cursor, theme),
        View::ProviderSelect(state) => draw_provider_select(f, chunks[1], app, state, theme),
        View::Loading(state) => draw_loading(f, chunks[1], state, theme),
        View::ScenarioList(state) => draw_scenario_list(f, chunks[1], app, state, theme),
        View::Runner(session) => draw_runner(f, chunks[1], session, theme),
        View::Help => draw_help(f, chunks[1], theme),
        View::Terminated => draw_terminated(f, chunks[1], app, theme),
    }

    let keys = Paragraph::new(Line::from(Span::styled(
        footer_hint(app.view()),
        Style::default().fg(theme.dim),
    )));
    f.render_widget(keys, chunks[2]);
}

fn footer_hint(view: &View) -> &'static str {
    match view {
        View::Menu(_) => " ↑/↓ move · enter select · q quit",
        View::ProviderSelect(_) | View::ScenarioList(_) => {
            " ↑/↓ move · enter select · esc back · ctrl-c quit"
        }
        View::Loading(_) => " esc cancel · ctrl-c quit",
        View::Runner(_) => " esc back to scenarios · ctrl-c quit",
        View::Help => " esc back · ctrl-c quit",
        View::Terminated => "",
    }
}

fn cursor_line<'a>(selected: bool, text: String, theme: &Theme) -> Line<'a> {
    if selected {
        Line::from(vec![
            Span::styled("▸ ", Style::default().fg(theme.accent)),
            Span::styled(
                text,
                Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
            ),
        ])
    } else {
        Line::from(vec![Span::raw("  "), Span::raw(text)])
    }
}

fn draw_menu(f: &mut Frame, area: Rect, cursor: usize, theme: &Theme) {
    let mut lines = vec![
        Line::from("Watch concurrent database transactions interact in real time."),
        Line::from(""),
    ];
    for (i, item) in MENU_ITEMS.iter().enumerate() {
        lines.push(cursor_line(i == cursor, (*item).to_string(), theme));
    }
    let menu = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Main Menu"));
    f.render_widget(menu, area);
}

fn draw_provider_select(
    f: &mut Frame,
    area: Rect,
    app: &App,
    state: &ProviderSelectState,
    theme: &Theme,
) {
    let mut lines = Vec::new();
    for (i, provider) in app.registry().all().iter().enumerate() {
        lines.push(cursor_line(i == state.cursor, provider.name().to_string(), theme));
        lines.push(Line::from(vec![
            Span::raw("    "),
            Span::styled(provider.description().to_string(), Style::default().fg(theme.dim)),
        ]));
    }
    if app.registry().is_empty() {
        lines.push(Line::from(Span::styled(
            "No providers registered.",
            Style::default().fg(theme.dim),
        )));
    }
    if let Some(err) = &state.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("✗ {err}"),
            Style::default().fg(theme.error),
        )));
    }
    let list = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Select a Database Provider"));
    f.render_widget(list, area);
}

fn draw_loading(f: &mut Frame, area: Rect, state: &LoadingState, theme: &Theme) {
    let spinner = SPINNER[state.frame % SPINNER.len()];
    // Rotate tips slower than the spinner.
    let tip = LOADING_TIPS[(state.frame / 30) % LOADING_TIPS.len()];
    let lines = vec![
        Line::from(vec![
            Span::styled(spinner, Style::default().fg(theme.accent)),
            Span::raw(format!(" Starting {}…", state.provider.name())),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Pulling the image, waiting for the server, initiating the replica set.",
            Style::default().fg(theme.dim),
        )),
        Line::from("This can take a minute on first run."),
        Line::from(""),
        Line::from(vec![
            Span::styled("Tip: ", Style::default().fg(theme.accent)),
            Span::styled(tip, Style::default().fg(theme.dim)),
        ]),
    ];
    let loading = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Starting Up"));
    f.render_widget(loading, area);
}

fn draw_scenario_list(
    f: &mut Frame,
    area: Rect,
    app: &App,
    state: &ScenarioListState,
    theme: &Theme,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(9)].as_ref())
        .split(area);

    let mut lines = Vec::new();
    if let Some(provider) = app.active_provider() {
        lines.push(Line::from(vec![
            Span::styled("● ", Style::default().fg(theme.ok)),
            Span::raw(format!("{} running - {}", provider.name(), provider.connection_info())),
        ]));
        lines.push(Line::from(""));
    }
    for (i, scenario) in state.scenarios.iter().enumerate() {
        lines.push(cursor_line(i == state.cursor, scenario.name().to_string(), theme));
        lines.push(Line::from(vec![
            Span::raw("    "),
            Span::styled(
                scenario.isolation_level().to_string(),
                Style::default().fg(theme.dim),
            ),
        ]));
    }
    let list = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Select a Scenario"));
    f.render_widget(list, chunks[0]);

    let description = state
        .scenarios
        .get(state.cursor)
        .map(|s| s.description().to_string())
        .unwrap_or_default();
    let detail = Paragraph::new(description)
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(theme.dim))
        .block(Block::default().borders(Borders::ALL).title("About"));
    f.render_widget(detail, chunks[1]);
}

fn step_lines<'a>(step: &StepResult, theme: &Theme) -> Vec<Line<'a>> {
    if step.is_header {
        return vec![
            Line::from(""),
            Line::from(Span::styled(
                step.description.clone(),
                Style::default().fg(theme.header).add_modifier(Modifier::BOLD),
            )),
        ];
    }

    let session_style = Style::default().fg(theme.session_color(&step.session));
    let mut lines = vec![Line::from(vec![
        Span::styled(format!("{:>2}. ", step.step), Style::default().fg(theme.dim)),
        Span::styled(format!("[{}] ", step.session), session_style),
        Span::raw(step.description.clone()),
    ])];
    if !step.query.is_empty() {
        lines.push(Line::from(vec![
            Span::raw("      "),
            Span::styled(format!("▸ {}", step.query), Style::default().fg(theme.dim)),
        ]));
    }
    if !step.result.is_empty() {
        let result_style = if step.success {
            Style::default().fg(theme.ok)
        } else {
            Style::default().fg(theme.error)
        };
        lines.push(Line::from(vec![
            Span::raw("      "),
            Span::styled(format!("→ {}", step.result), result_style),
        ]));
    }
    lines
}

fn draw_runner(f: &mut Frame, area: Rect, session: &Session, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(area);

    let mut lines = Vec::new();
    for step in &session.results {
        lines.extend(step_lines(step, theme));
    }

    // Keep the newest steps in view as they stream in.
    let viewport = chunks[0].height.saturating_sub(2) as usize;
    let scroll = lines.len().saturating_sub(viewport) as u16;
    let steps = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{} ({})", session.scenario.name(), session.scenario.isolation_level())),
        );
    f.render_widget(steps, chunks[0]);

    let status = if session.running {
        Line::from(vec![
            Span::styled(
                SPINNER[session.frame % SPINNER.len()],
                Style::default().fg(theme.accent),
            ),
            Span::raw(" Running…"),
        ])
    } else if let Some(err) = &session.error {
        Line::from(Span::styled(
            format!("✗ {err}"),
            Style::default().fg(theme.error),
        ))
    } else if session.done {
        Line::from(Span::styled(
            "✓ Scenario complete",
            Style::default().fg(theme.ok).add_modifier(Modifier::BOLD),
        ))
    } else {
        Line::from("")
    };
    let footer = Paragraph::new(status).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, chunks[1]);
}

fn draw_help(f: &mut Frame, area: Rect, theme: &Theme) {
    let key = |k: &'static str, desc: &'static str| {
        Line::from(vec![
            Span::raw("  "),
            Span::styled(k, Style::default().fg(theme.accent)),
            Span::raw(desc),
        ])
    };
    let lines = vec![
        Line::from("txdemo runs scripted transaction scenarios against a real database"),
        Line::from("in a throwaway Docker container and shows each step as it happens."),
        Line::from(""),
        Line::from("Each scenario opens two sessions and interleaves their reads and"),
        Line::from("writes to make one isolation guarantee visible."),
        Line::from(""),
        Line::from(Span::styled("Keys:", Style::default().add_modifier(Modifier::BOLD))),
        key("↑/↓ or k/j ", "  move selection"),
        key("enter       ", " confirm"),
        key("esc         ", " go back (stops the database when leaving the scenario list)"),
        key("q           ", " back, or quit from the main menu"),
        key("ctrl-c      ", " quit from anywhere"),
        Line::from(""),
        Line::from(Span::styled(
            "Requires Docker. The container is removed on exit.",
            Style::default().fg(theme.dim),
        )),
    ];
    let help = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Help & About"));
    f.render_widget(help, area);
}

fn draw_terminated(f: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let text = if app.active_provider().is_some() || app.is_quitting() {
        "Stopping database container…"
    } else {
        "Goodbye."
    };
    let p = Paragraph::new(Line::from(Span::styled(text, Style::default().fg(theme.dim))))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}
