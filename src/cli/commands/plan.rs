//! Plan command - show which steps a run would execute

use crate::cli::args::{OutputFormat, PlanArgs};
use crate::config::Config;
use crate::error::NightshiftResult;
use crate::pipeline::{Pipeline, StepKind};
use crate::platform::Platform;
use console::style;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct PlannedStep {
    step: StepKind,
    label: &'static str,
    runs: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    skip_reason: Option<String>,
}

/// Execute the plan command
pub async fn execute(args: PlanArgs, config: &Config) -> NightshiftResult<()> {
    let platform = match args.platform {
        Some(platform) => platform,
        None => Platform::detect()?,
    };

    let steps = planned_steps(config, platform);

    match args.format {
        OutputFormat::Table => print_plan_table(&steps, platform, config),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&steps)?),
        OutputFormat::Plain => {
            for step in steps.iter().filter(|s| s.runs) {
                println!("{}", step.step);
            }
        }
    }

    Ok(())
}

fn planned_steps(config: &Config, platform: Platform) -> Vec<PlannedStep> {
    Pipeline::standard()
        .plan(config, platform)
        .into_iter()
        .map(|(step, skip_reason)| PlannedStep {
            step,
            label: step.label(),
            runs: skip_reason.is_none(),
            skip_reason,
        })
        .collect()
}

fn print_plan_table(steps: &[PlannedStep], platform: Platform, config: &Config) {
    println!(
        "Pipeline for {} -> release {}",
        style(platform.name()).bold(),
        style(&config.release.tag).cyan()
    );
    println!();
    println!("{:<4} {:<20} {:<8} {}", "#", "STEP", "RUNS", "NOTE");
    println!("{}", "-".repeat(60));

    for (i, step) in steps.iter().enumerate() {
        let runs = if step.runs {
            style("yes").green().to_string()
        } else {
            style("no").dim().to_string()
        };
        println!(
            "{:<4} {:<20} {:<8} {}",
            i + 1,
            step.label,
            runs,
            step.skip_reason.as_deref().unwrap_or("")
        );
    }
}
