//! Schedule command - show upcoming scheduled runs

use crate::cli::args::ScheduleArgs;
use crate::config::Config;
use crate::error::NightshiftResult;
use crate::trigger::MonthlySchedule;
use chrono::Utc;

/// Execute the schedule command
pub async fn execute(args: ScheduleArgs, config: &Config) -> NightshiftResult<()> {
    let schedule: MonthlySchedule = config.trigger.schedule.parse()?;
    let after = args.after.unwrap_or_else(Utc::now);

    println!("Schedule: {} (UTC)", config.trigger.schedule);
    for at in schedule.upcoming(after, args.count) {
        println!("  {}", at.format("%Y-%m-%d %H:%M %Z"));
    }

    Ok(())
}
