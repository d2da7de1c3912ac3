//! Interactive presenter: confirmation prompt, progress bar, colored result.

use std::io::{IsTerminal, Write};

use dialoguer::Confirm;
use owo_colors::OwoColorize;

use crate::error::ApiError;
use crate::orchestrator::{Presenter, RunOutcome, RunPhase, RunState};
use crate::types::RecordType;

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];
const BAR_WIDTH: usize = 30;
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Draws on stderr so stdout stays clean for the command result.
pub struct TerminalPresenter {
    assume_yes: bool,
    interactive: bool,
    tick: usize,
}

impl TerminalPresenter {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            interactive: std::io::stderr().is_terminal(),
            tick: 0,
        }
    }

    fn draw(&self, line: &str) {
        let mut err = std::io::stderr().lock();
        if self.interactive {
            let _ = write!(err, "{}{}", CLEAR_LINE, line);
        } else {
            let _ = writeln!(err, "{}", line);
        }
        let _ = err.flush();
    }
}

impl Presenter for TerminalPresenter {
    fn confirm(&mut self, record_type: RecordType) -> Result<bool, ApiError> {
        if self.assume_yes {
            return Ok(true);
        }
        Confirm::new()
            .with_prompt(format!(
                "Delete ALL {}? This cannot be undone.",
                record_type.plural()
            ))
            .default(false)
            .interact()
            .map_err(|e| ApiError::ConfigError(format!("Failed to get user input: {}", e)))
    }

    fn phase_changed(&mut self, record_type: RecordType, phase: RunPhase) {
        match phase {
            RunPhase::Counting => self.draw(&format!("Counting {}...", record_type.plural())),
            RunPhase::Verifying => self.draw(&format!("Verifying {}...", record_type.plural())),
            _ => {}
        }
    }

    fn progress(&mut self, state: &RunState) {
        let pct = state.percentage();
        let filled = (pct as usize * BAR_WIDTH) / 100;
        let bar = format!("{}{}", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled));
        let glyph = SPINNER[self.tick % SPINNER.len()];
        self.tick += 1;
        let skipped = if state.cumulative_skipped > 0 {
            format!(", {} skipped", state.cumulative_skipped)
                .yellow()
                .to_string()
        } else {
            String::new()
        };
        self.draw(&format!(
            "{} [{}] {:>3}%  {}/{} {} deleted{}",
            glyph.cyan(),
            bar,
            pct,
            state.processed_offset,
            state.total,
            state.record_type.plural(),
            skipped
        ));
    }

    fn finished(&mut self, outcome: &RunOutcome) {
        let message = outcome.message();
        let styled = match outcome {
            RunOutcome::Succeeded(summary) if summary.skipped > 0 => message.yellow().to_string(),
            RunOutcome::Succeeded(_) => message.green().to_string(),
            RunOutcome::Failed { .. } => message.red().bold().to_string(),
            RunOutcome::Declined(_) => message.dimmed().to_string(),
        };
        self.draw(&styled);
        if self.interactive {
            let _ = writeln!(std::io::stderr());
        }
    }

    fn refresh(&mut self) {
        self.tick = 0;
        if self.interactive {
            let mut err = std::io::stderr().lock();
            let _ = write!(err, "{}", CLEAR_LINE);
            let _ = err.flush();
        }
    }
}
