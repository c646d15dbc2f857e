//! Visual theme and styling.

use console::Style;

/// Styles used for terminal output.
#[derive(Debug, Clone)]
pub struct PassflowTheme {
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    /// Phase names
    pub phase: Style,
    /// Secondary text: counters, durations, origins
    pub dim: Style,
    pub highlight: Style,
}

impl Default for PassflowTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl PassflowTheme {
    /// Create the colored theme.
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
            phase: Style::new().cyan().bold(),
            dim: Style::new().dim(),
            highlight: Style::new().bold(),
        }
    }

    /// Create a theme without colors (for non-TTY or --no-color).
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            phase: Style::new(),
            dim: Style::new(),
            highlight: Style::new(),
        }
    }

    /// Pick the colored or plain theme.
    pub fn for_colors(colors: bool) -> Self {
        if colors {
            Self::new()
        } else {
            Self::plain()
        }
    }

    pub fn format_success(&self, msg: &str) -> String {
        format!("{}", self.success.apply_to(format!("✓ {}", msg)))
    }

    pub fn format_warning(&self, msg: &str) -> String {
        format!("{}", self.warning.apply_to(format!("⚠ {}", msg)))
    }

    pub fn format_error(&self, msg: &str) -> String {
        format!("{}", self.error.apply_to(format!("✗ {}", msg)))
    }

    /// Format a phase heading with its unit count.
    pub fn format_phase(&self, phase: &str, units: usize) -> String {
        let label = if units == 1 { "unit" } else { "units" };
        format!(
            "{} {}",
            self.phase.apply_to(format!("▸ {}", phase)),
            self.dim.apply_to(format!("({} {})", units, label))
        )
    }

    pub fn format_header(&self, title: &str) -> String {
        format!("{}", self.highlight.apply_to(title))
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    // https://no-color.org/
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    console::Term::stdout().is_term()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_theme_formats_status_lines() {
        let theme = PassflowTheme::plain();
        assert_eq!(theme.format_success("Complete"), "✓ Complete");
        assert_eq!(theme.format_warning("Caution"), "⚠ Caution");
        assert_eq!(theme.format_error("Failed"), "✗ Failed");
    }

    #[test]
    fn phase_heading_pluralizes() {
        let theme = PassflowTheme::plain();
        assert_eq!(theme.format_phase("build", 1), "▸ build (1 unit)");
        assert_eq!(theme.format_phase("setup", 3), "▸ setup (3 units)");
    }

    #[test]
    fn colored_theme_keeps_text() {
        let theme = PassflowTheme::for_colors(true);
        assert!(theme.format_success("done").contains("done"));
    }
}
