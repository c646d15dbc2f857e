//! Terminal UI.

use console::Term;
use std::io::Write;

use super::{should_use_colors, OutputMode, PassflowTheme, UserInterface};

/// Terminal UI writing status to stdout and errors to stderr.
pub struct TerminalUI {
    out: Term,
    err: Term,
    theme: PassflowTheme,
    mode: OutputMode,
}

impl TerminalUI {
    /// Create a new terminal UI.
    pub fn new(mode: OutputMode, colors: bool) -> Self {
        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            theme: PassflowTheme::for_colors(colors),
            mode,
        }
    }
}

impl UserInterface for TerminalUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.out, "{}", msg).ok();
        }
    }

    fn success(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.out, "{}", self.theme.format_success(msg)).ok();
        }
    }

    fn warning(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.err, "{}", self.theme.format_warning(msg)).ok();
        }
    }

    fn error(&mut self, msg: &str) {
        writeln!(self.err, "{}", self.theme.format_error(msg)).ok();
    }

    fn show_header(&mut self, title: &str) {
        if self.mode.shows_status() {
            writeln!(self.out, "{}\n", self.theme.format_header(title)).ok();
        }
    }

    fn show_phase(&mut self, phase: &str, units: usize) {
        if self.mode.shows_status() {
            writeln!(self.out, "{}", self.theme.format_phase(phase, units)).ok();
        }
    }

    fn show_unit(&mut self, index: usize, total: usize, id: &str) {
        if self.mode.shows_units() {
            writeln!(
                self.out,
                "  {} {}",
                self.theme.dim.apply_to(format!("[{}/{}]", index, total)),
                id
            )
            .ok();
        }
    }
}

/// Create the UI for the given mode.
///
/// Colors are used only when allowed and stdout is a terminal.
pub fn create_ui(mode: OutputMode, allow_colors: bool) -> Box<dyn UserInterface> {
    Box::new(TerminalUI::new(mode, allow_colors && should_use_colors()))
}
