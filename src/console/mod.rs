//! Terminal presentation for the `speed-probe` binary.

pub mod display_mode;
pub mod renderer;

pub use display_mode::DisplayMode;
pub use renderer::{format_event, render_report};

use crate::progress::{ProgressCallback, ProgressEvent};

/// Prints progress lines to stderr when the mode shows progress.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleProgress {
    mode: DisplayMode,
}

impl ConsoleProgress {
    pub fn new(mode: DisplayMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }
}

impl ProgressCallback for ConsoleProgress {
    fn on_progress(&self, event: ProgressEvent) {
        if !self.mode.shows_progress() {
            return;
        }

        if let Some(line) = format_event(&event) {
            eprintln!("{}", line);
        }
    }
}
