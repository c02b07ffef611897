//! Terminal output: progress bar and coloured per-unit lines.
//!
//! Uses `indicatif` for the bar and `console` for styling. [`BatchProgress`]
//! is driven by the orchestrator's `on_progress` and `on_unit_complete`
//! callbacks.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use scanflow::{JobRecord, OrchestrationResult, Outcome};

/// Visual progress for one orchestration run.
///
/// Shows a bar of finished units out of the total, prints one line per unit
/// as it completes (green for success, red for failure or rejection, yellow
/// for timeouts) and a summary at the end.
pub struct BatchProgress {
    // Bar counting finished units; hidden in JSON mode.
    pb: ProgressBar,
    // Succeeded units and all-clear summaries.
    green: Style,
    // Failed and rejected units.
    red: Style,
    // Timed-out units and partial summaries.
    yellow: Style,
    // Cancelled units.
    dim: Style,
}

impl BatchProgress {
    /// Starts a bar of `total` units. Hidden when `quiet` (JSON output).
    pub fn start(label: &str, total: usize, quiet: bool) -> Self {
        let pb = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total as u64)
        };
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg} [{bar:30.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        pb.set_message(label.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }

    /// Moves the bar to `completed` of `total`.
    pub fn update(&self, completed: usize, total: usize) {
        self.pb.set_length(total as u64);
        self.pb.set_position(completed as u64);
    }

    /// Prints one line for a unit that just reached its final state.
    pub fn unit_complete(&self, unit_ref: &str, record: &JobRecord) {
        let line = match record.outcome() {
            Outcome::Succeeded => format!("  {} {unit_ref}", self.green.apply_to("✓")),
            Outcome::Failed | Outcome::SubmissionFailed => format!(
                "  {} {unit_ref}: {}",
                self.red.apply_to("✗"),
                record.error.as_deref().unwrap_or("failed")
            ),
            Outcome::TimedOut => format!(
                "  {} {unit_ref}: gave up waiting",
                self.yellow.apply_to("?")
            ),
            Outcome::Cancelled => format!("  {} {unit_ref}: cancelled", self.dim.apply_to("-")),
            Outcome::InProgress => return,
        };
        self.pb.println(line);
    }

    /// Clears the bar and prints the final summary.
    pub fn finish(&self, result: &OrchestrationResult) {
        self.pb.finish_and_clear();
        let summary = result.summary();
        let style = if result.all_succeeded() {
            &self.green
        } else if summary.succeeded == 0 {
            &self.red
        } else {
            &self.yellow
        };
        println!(
            "{} {}/{} done in {} round(s): {summary}",
            style.apply_to("■"),
            summary.succeeded,
            result.total,
            result.rounds
        );
    }

    /// Leaves the bar where it stopped and prints the partial summary.
    pub fn cancelled(&self, result: &OrchestrationResult) {
        self.pb.abandon();
        println!(
            "{} cancelled after {} round(s): {}",
            self.yellow.apply_to("■"),
            result.rounds,
            result.summary()
        );
    }
}
