//! User-facing terminal output.
//!
//! - [`UserInterface`] trait for UI abstraction
//! - [`TerminalUI`] writing to stdout/stderr
//! - [`MockUI`] capturing output in tests
//!
//! # Example
//!
//! ```
//! use passflow::ui::{create_ui, OutputMode};
//!
//! let mut ui = create_ui(OutputMode::Quiet, false);
//! ui.show_header("passflow");
//! ui.success("Pipeline complete");
//! ```

pub mod mock;
pub mod output;
pub mod terminal;
pub mod theme;

pub use mock::MockUI;
pub use output::{format_duration, OutputMode};
pub use terminal::{create_ui, TerminalUI};
pub use theme::{should_use_colors, PassflowTheme};

/// Trait for user interface interactions.
///
/// This trait allows mocking the UI in tests.
pub trait UserInterface {
    /// Get the current output mode.
    fn output_mode(&self) -> OutputMode;

    /// Display a plain line.
    fn message(&mut self, msg: &str);

    /// Display a success message.
    fn success(&mut self, msg: &str);

    /// Display a warning message.
    fn warning(&mut self, msg: &str);

    /// Display an error message. Shown in every mode.
    fn error(&mut self, msg: &str);

    /// Show a header/banner.
    fn show_header(&mut self, title: &str);

    /// Show the start of a phase.
    fn show_phase(&mut self, phase: &str, units: usize);

    /// Show a unit starting (e.g. "[3/7] assets.pack").
    fn show_unit(&mut self, index: usize, total: usize, id: &str);
}
