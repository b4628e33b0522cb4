//! Colours for prompts and pipeline step statuses

use crate::pipeline::StepStatus;
use cliclack::ThemeState;
use console::Style;

/// Night-blue prompt theme. Also carries the step status colours used by
/// log lines and run summaries.
#[derive(Debug, Clone, Default)]
pub struct NightshiftTheme;

impl NightshiftTheme {
    /// Colour for a step status
    pub fn status_style(status: StepStatus) -> Style {
        match status {
            StepStatus::Passed => Style::new().green(),
            StepStatus::Degraded => Style::new().yellow(),
            StepStatus::Failed => Style::new().red(),
            StepStatus::Skipped => Style::new().dim(),
        }
    }
}

impl cliclack::Theme for NightshiftTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().blue(),
            ThemeState::Error(_) => Self::status_style(StepStatus::Failed),
            ThemeState::Cancel => Self::status_style(StepStatus::Skipped),
            ThemeState::Submit => Style::new().blue().dim(),
        }
    }

    fn state_symbol_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().magenta(),
            ThemeState::Error(_) => Self::status_style(StepStatus::Failed),
            ThemeState::Cancel => Self::status_style(StepStatus::Skipped),
            ThemeState::Submit => Self::status_style(StepStatus::Passed),
        }
    }
}

pub fn init_theme() {
    cliclack::set_theme(NightshiftTheme);
}

#[cfg(test)]
mod tests {
    use super::*;
    use cliclack::Theme;

    fn painted(style: Style) -> String {
        style.force_styling(true).apply_to("x").to_string()
    }

    #[test]
    fn statuses_have_distinct_colours() {
        assert!(painted(NightshiftTheme::status_style(StepStatus::Passed)).contains("\u{1b}[32m"));
        assert!(painted(NightshiftTheme::status_style(StepStatus::Degraded)).contains("\u{1b}[33m"));
        assert!(painted(NightshiftTheme::status_style(StepStatus::Failed)).contains("\u{1b}[31m"));
    }

    #[test]
    fn prompt_errors_use_failure_colour() {
        let theme = NightshiftTheme;
        assert_eq!(
            theme.bar_color(&ThemeState::Error(String::new())),
            NightshiftTheme::status_style(StepStatus::Failed)
        );
    }
}
