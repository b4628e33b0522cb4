//! Terminal output for nightshift
//!
//! Uses `cliclack` for prompts and log lines with automatic fallback to
//! plain, grep-friendly output in CI where runs usually happen.
//!
//! # Example
//!
//! ```rust,ignore
//! use nightshift::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//!
//! ui::intro(&ctx, "nightshift status");
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Fetching nightly release...");
//! spinner.stop("nightly has 2 assets");
//!
//! ui::step_warn_hint(&ctx, "GITHUB_TOKEN not set", "export GITHUB_TOKEN");
//! ui::outro_success(&ctx, "Ready");
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, key_value, key_value_status, outro_error, outro_success, remark, section,
    step_error_detail, step_info, step_ok, step_ok_detail, step_outcome, step_skipped, step_warn,
    step_warn_hint,
};
pub use progress::{StepProgress, TaskSpinner};
pub use prompts::confirm_removal;
pub use theme::{init_theme, NightshiftTheme};
