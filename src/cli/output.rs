//! Output formatting for the azurearm CLI
//!
//! Human output is colored YAML-ish text; `--output json` and
//! `--output yaml` print one machine-readable document per command.

use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

use super::OutputFormat;
use azurearm::states::{StateReturn, StateStatus};

/// `text` in the color of `status`.
fn paint(text: &str, status: StateStatus, use_color: bool) -> String {
    if !use_color {
        return text.to_string();
    }
    match status {
        StateStatus::Ok => text.green().to_string(),
        StateStatus::Changed => text.yellow().to_string(),
        StateStatus::Pending => text.cyan().to_string(),
        StateStatus::Failed => text.red().bold().to_string(),
    }
}

fn status_label(status: StateStatus, use_color: bool) -> String {
    paint(&status.to_string(), status, use_color)
}

/// Per-status counters of an `apply` run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Recap {
    pub ok: usize,
    pub changed: usize,
    pub pending: usize,
    pub failed: usize,
}

impl Recap {
    pub fn record(&mut self, status: StateStatus) {
        match status {
            StateStatus::Ok => self.ok += 1,
            StateStatus::Changed => self.changed += 1,
            StateStatus::Pending => self.pending += 1,
            StateStatus::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.ok + self.changed + self.pending + self.failed
    }
}

/// Output formatter for the selected format
pub struct OutputFormatter {
    use_color: bool,
    format: OutputFormat,
    verbosity: u8,
    start_time: Instant,
}

impl OutputFormatter {
    pub fn new(use_color: bool, format: OutputFormat, verbosity: u8) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();

        Self {
            use_color,
            format,
            verbosity,
            start_time: Instant::now(),
        }
    }

    pub fn is_human(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if !self.is_human() {
            return;
        }

        if self.use_color {
            println!("\n{}", title.cyan().bold());
            println!("{}", "-".repeat(title.len()).cyan());
        } else {
            println!("\n{}", title);
            println!("{}", "-".repeat(title.len()));
        }
    }

    /// Print any serializable document in the selected format.
    pub fn document<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml | OutputFormat::Human => print!("{}", serde_yaml::to_string(value)?),
        }
        Ok(())
    }

    /// Print the return value of a function call.
    pub fn value(&self, value: &Value) -> anyhow::Result<()> {
        if self.is_human() && self.use_color && value.get("error").is_some() {
            eprintln!("{}", "The call reported an error:".red().bold());
        }
        self.document(value)
    }

    /// Print one state outcome as it completes (human output only).
    pub fn state_result(&self, id: &str, function: &str, ret: &StateReturn) {
        if !self.is_human() {
            return;
        }

        let status = ret.status();
        let header = format!("[{}] {}", id, function);
        if self.use_color {
            println!("{}: {}", status_label(status, true), header.bright_white());
        } else {
            println!("{}: {}", status, header);
        }
        if !ret.comment.is_empty() {
            println!("    {}", ret.comment);
        }
        if !ret.changes.is_empty() && (status != StateStatus::Ok || self.verbosity > 0) {
            if let Ok(changes) = serde_yaml::to_string(&ret.changes) {
                for line in changes.lines() {
                    let line = format!("      {}", line);
                    if self.use_color {
                        println!("{}", line.yellow());
                    } else {
                        println!("{}", line);
                    }
                }
            }
        }
    }

    /// Print the run summary (human output only).
    pub fn recap(&self, recap: &Recap) {
        if !self.is_human() {
            return;
        }

        self.section("SUMMARY");
        let field = |label: &str, count: usize, status: StateStatus| {
            paint(&format!("{}={}", label, count), status, self.use_color && count > 0)
        };
        println!(
            "{}  {}  {}  {}  (total {})",
            field("ok", recap.ok, StateStatus::Ok),
            field("changed", recap.changed, StateStatus::Changed),
            field("pending", recap.pending, StateStatus::Pending),
            field("failed", recap.failed, StateStatus::Failed),
            recap.total()
        );
        if self.verbosity > 0 {
            println!("Finished in {:.2?}", self.start_time.elapsed());
        }
    }

    /// Print a list of names under a title.
    pub fn list(&self, title: &str, items: &[String]) -> anyhow::Result<()> {
        if !self.is_human() {
            return self.document(&items);
        }
        self.section(title);
        for item in items {
            println!("  {}", item);
        }
        Ok(())
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "ERROR:".red().bold(), message.red());
        } else {
            eprintln!("ERROR: {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "WARNING:".yellow().bold(), message.yellow());
        } else {
            eprintln!("WARNING: {}", message);
        }
    }

    /// Print a debug message (only at -vv and above)
    pub fn debug(&self, message: &str) {
        if self.verbosity < 2 {
            return;
        }
        if self.use_color {
            eprintln!("{} {}", "DEBUG:".bright_black(), message.bright_black());
        } else {
            eprintln!("DEBUG: {}", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recap_counts() {
        let mut recap = Recap::default();
        recap.record(StateStatus::Ok);
        recap.record(StateStatus::Changed);
        recap.record(StateStatus::Changed);
        recap.record(StateStatus::Failed);
        assert_eq!(recap.changed, 2);
        assert_eq!(recap.failed, 1);
        assert_eq!(recap.total(), 4);
    }

    #[test]
    fn test_status_label_without_color() {
        assert_eq!(status_label(StateStatus::Pending, false), "pending");
        assert_eq!(status_label(StateStatus::Failed, false), "failed");
    }
}
