//! Color palette for the TUI. A plain value threaded into every draw call so
//! views never reach for global style state.

use ratatui::style::Color;

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub accent: Color,
    pub dim: Color,
    pub ok: Color,
    pub error: Color,
    pub header: Color,
    pub session_a: Color,
    pub session_b: Color,
    pub setup: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Yellow,
            dim: Color::Gray,
            ok: Color::Green,
            error: Color::Red,
            header: Color::Magenta,
            session_a: Color::Cyan,
            session_b: Color::Green,
            setup: Color::Gray,
        }
    }
}

impl Theme {
    /// Stable color per session label so both transaction streams stay
    /// visually distinct throughout a run.
    pub fn session_color(&self, session: &str) -> Color {
        match session {
            "Session A" => self.session_a,
            "Session B" => self.session_b,
            _ => self.setup,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_colors_distinguish_the_two_streams() {
        let theme = Theme::default();
        assert_ne!(
            theme.session_color("Session A"),
            theme.session_color("Session B")
        );
        assert_eq!(theme.session_color("Setup"), theme.setup);
    }
}
