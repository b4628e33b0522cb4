//! Output functions for consistent CLI formatting

use super::context::UiContext;
use crate::pipeline::{StepOutcome, StepStatus};
use super::theme::NightshiftTheme;
use console::style;

/// Display intro banner
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        cliclack::intro(style(title).blue().bold()).ok();
    } else {
        println!("{}", style(title).blue().bold());
        println!();
    }
}

/// Display success outro
pub fn outro_success(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::outro(style(message).green().bold()).ok();
    } else {
        println!();
        println!("{} {}", style("[OK]").green(), message);
    }
}

/// Display error outro
pub fn outro_error(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::outro(style(message).red().bold()).ok();
    } else {
        println!();
        println!("{} {}", style("[ERROR]").red(), message);
    }
}

/// Display a section header
pub fn section(ctx: &UiContext, title: &str) {
    println!();
    if ctx.use_fancy_output() {
        cliclack::log::info(style(title).bold()).ok();
    } else {
        println!("{}", style(title).bold());
    }
}

/// Line marker, rendered as a cliclack log level or a bracketed tag
#[derive(Clone, Copy)]
enum Marker {
    Ok,
    Warn,
    Fail,
    Info,
    Skip,
}

impl Marker {
    fn tag(self) -> String {
        match self {
            Marker::Ok => paint(StepStatus::Passed, "[OK]"),
            Marker::Warn => paint(StepStatus::Degraded, "[WARN]"),
            Marker::Fail => paint(StepStatus::Failed, "[FAIL]"),
            Marker::Info => style("[INFO]").cyan().to_string(),
            Marker::Skip => paint(StepStatus::Skipped, "[-]"),
        }
    }
}

fn paint(status: StepStatus, text: &str) -> String {
    NightshiftTheme::status_style(status).apply_to(text).to_string()
}

fn emit(ctx: &UiContext, marker: Marker, fancy: String, plain: String) {
    if !ctx.use_fancy_output() {
        println!("  {} {}", marker.tag(), plain);
        return;
    }
    let _ = match marker {
        Marker::Ok => cliclack::log::success(fancy),
        Marker::Warn => cliclack::log::warning(fancy),
        Marker::Fail => cliclack::log::error(fancy),
        Marker::Info | Marker::Skip => cliclack::log::info(fancy),
    };
}

pub fn step_ok(ctx: &UiContext, message: &str) {
    emit(ctx, Marker::Ok, message.to_string(), message.to_string());
}

pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    emit(
        ctx,
        Marker::Ok,
        format!("{} ({})", message, style(detail).dim()),
        format!("{} ({})", message, detail),
    );
}

pub fn step_warn(ctx: &UiContext, message: &str) {
    emit(ctx, Marker::Warn, message.to_string(), message.to_string());
}

/// Warning followed by what to do about it
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    emit(
        ctx,
        Marker::Warn,
        format!("{} - {}", message, style(hint).dim()),
        format!("{} - {}", message, hint),
    );
}

pub fn step_error_detail(ctx: &UiContext, message: &str, detail: &str) {
    emit(
        ctx,
        Marker::Fail,
        format!("{}: {}", message, style(detail).red()),
        format!("{}: {}", message, detail),
    );
}

pub fn step_info(ctx: &UiContext, message: &str) {
    emit(ctx, Marker::Info, message.to_string(), message.to_string());
}

/// A step that did not run, with the reason
pub fn step_skipped(ctx: &UiContext, name: &str, reason: &str) {
    emit(
        ctx,
        Marker::Skip,
        format!(
            "{} - {}",
            style(name).dim(),
            style(format!("skipped ({})", reason)).dim()
        ),
        format!("{} (skipped: {})", name, reason),
    );
}

/// Render one finished pipeline step
pub fn step_outcome(ctx: &UiContext, outcome: &StepOutcome) {
    let name = outcome.kind.label();
    // Failure details carry the command's output tail; show its first line
    let summary = outcome.detail.lines().next().unwrap_or_default();
    match outcome.status {
        StepStatus::Passed if summary.is_empty() => step_ok(ctx, name),
        StepStatus::Passed => step_ok_detail(ctx, name, summary),
        StepStatus::Degraded => step_warn_hint(ctx, name, summary),
        StepStatus::Failed => step_error_detail(ctx, name, summary),
        StepStatus::Skipped => step_skipped(ctx, name, summary),
    }
}

/// Display a remark/hint
pub fn remark(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::remark(message).ok();
    } else {
        println!("  {}", style(message).dim());
    }
}

/// Print styled key-value pair
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}

/// Print styled key-value with status color
pub fn key_value_status(ctx: &UiContext, key: &str, value: &str, ok: bool) {
    let value_style = NightshiftTheme::status_style(if ok {
        StepStatus::Passed
    } else {
        StepStatus::Degraded
    });

    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), value_style.apply_to(value));
    } else {
        let prefix = if ok { "[OK]" } else { "[WARN]" };
        println!("  {} {}: {}", prefix, key, value);
    }
}
