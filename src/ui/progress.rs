//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    /// Create a new spinner (shows on `start` in interactive mode)
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else if self.interactive {
            println!("{} {}", style("✓").green(), message);
        } else {
            println!("{} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with warning message
    pub fn stop_warn(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else if self.interactive {
            println!("{} {}", style("!").yellow(), message);
        } else {
            println!("{} {}", style("[WARN]").yellow(), message);
        }
    }
}

/// Live view of the step currently executing.
///
/// Interactive terminals get an indicatif spinner that counts compiled
/// crates and shows the latest output line. In CI every line of child
/// output is passed through so it lands in the job log.
pub struct StepProgress {
    bar: Mutex<Option<ProgressBar>>,
    interactive: bool,
}

impl StepProgress {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            bar: Mutex::new(None),
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Show that `label` has started
    pub fn begin(&self, label: &str) {
        if !self.interactive {
            println!("{} {}", style("==>").blue().bold(), label);
            return;
        }

        let bar = ProgressBar::new_spinner();
        if let Ok(template) =
            ProgressStyle::with_template("  {spinner:.blue} {prefix}  {msg:.dim}  {elapsed:.dim}")
        {
            bar.set_style(template.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        }
        bar.set_prefix(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    /// Feed one line of child process output
    pub fn on_line(&self, line: String) {
        let bar = self.bar.lock().ok().and_then(|slot| slot.clone());
        let Some(bar) = bar else {
            if !self.interactive {
                println!("    {}", line);
            }
            return;
        };

        match parse_cargo_line(&line) {
            Some(CargoLine::Compiling(krate)) => {
                bar.inc(1);
                bar.set_message(format!("{} crates, compiling {}", bar.position(), krate));
            }
            Some(CargoLine::TestResult(summary)) => bar.set_message(summary.to_string()),
            None => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    bar.set_message(truncate(trimmed, 60));
                }
            }
        }
    }

    /// Clear the spinner for the current step
    pub fn end(&self) {
        if let Some(bar) = self.bar.lock().ok().and_then(|mut slot| slot.take()) {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum CargoLine<'a> {
    /// `Compiling <crate> v<version>`
    Compiling(&'a str),
    /// `test result: ok. 12 passed; ...`
    TestResult(&'a str),
}

fn parse_cargo_line(line: &str) -> Option<CargoLine<'_>> {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix("Compiling ") {
        return rest.split_whitespace().next().map(CargoLine::Compiling);
    }
    trimmed.strip_prefix("test result: ").map(CargoLine::TestResult)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
