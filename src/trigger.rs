//! Run triggers
//!
//! A nightly is produced for pushes to the release branch and on a fixed
//! monthly schedule. Manual runs are always admitted.

use crate::config::schema::TriggerConfig;
use crate::error::{NightshiftError, NightshiftResult};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Event that started a pipeline instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum Trigger {
    /// Push to a branch
    Push { branch: String },
    /// Scheduled recurrence
    Schedule,
    /// Started by hand
    Manual,
}

impl Trigger {
    /// Build a trigger from a CI event name and optional branch ref.
    ///
    /// Accepts GitHub-style names (`workflow_dispatch`) as well as our own.
    pub fn from_event(event: &str, branch: Option<&str>) -> NightshiftResult<Self> {
        match event {
            "push" => {
                let branch = branch.map(normalize_ref).unwrap_or_default();
                Ok(Self::Push { branch })
            }
            "schedule" => Ok(Self::Schedule),
            "manual" | "workflow_dispatch" => Ok(Self::Manual),
            other => Err(NightshiftError::InvalidEvent(other.to_string())),
        }
    }

    /// Whether this event should produce a nightly
    pub fn is_eligible(&self, config: &TriggerConfig) -> bool {
        match self {
            Self::Push { branch } => *branch == config.branch,
            Self::Schedule | Self::Manual => true,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push { branch } => write!(f, "push to {}", branch),
            Self::Schedule => write!(f, "schedule"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Strip `refs/heads/` from a full ref name
fn normalize_ref(git_ref: &str) -> String {
    git_ref
        .strip_prefix("refs/heads/")
        .unwrap_or(git_ref)
        .to_string()
}

/// Monthly recurrence in cron form: `minute hour day-of-month * *`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlySchedule {
    minute: u32,
    hour: u32,
    day: u32,
}

impl MonthlySchedule {
    /// Next fire time strictly after `after`.
    ///
    /// Months that lack the configured day (e.g. the 31st) are skipped.
    pub fn next_after(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        let mut year = after.year();
        let mut month = after.month();

        loop {
            let candidate = Utc
                .with_ymd_and_hms(year, month, self.day, self.hour, self.minute, 0)
                .single();
            if let Some(at) = candidate.filter(|at| *at > after) {
                return at;
            }
            if month == 12 {
                month = 1;
                year += 1;
            } else {
                month += 1;
            }
        }
    }

    /// The next `count` fire times after `after`
    pub fn upcoming(&self, after: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        let mut times = Vec::with_capacity(count);
        let mut cursor = after;
        for _ in 0..count {
            cursor = self.next_after(cursor);
            times.push(cursor);
        }
        times
    }
}

impl FromStr for MonthlySchedule {
    type Err = NightshiftError;

    fn from_str(expr: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| NightshiftError::InvalidSchedule {
            expr: expr.to_string(),
            reason: reason.to_string(),
        };

        let fields: Vec<&str> = expr.split_whitespace().collect();
        let [minute, hour, day, month, weekday] = fields.as_slice() else {
            return Err(invalid("expected 5 fields"));
        };

        if *month != "*" || *weekday != "*" {
            return Err(invalid("month and weekday must be *"));
        }

        let parse = |field: &str, name: &str, range: std::ops::RangeInclusive<u32>| {
            field
                .parse::<u32>()
                .ok()
                .filter(|v| range.contains(v))
                .ok_or_else(|| invalid(&format!("{} out of range", name)))
        };

        Ok(Self {
            minute: parse(*minute, "minute", 0..=59)?,
            hour: parse(*hour, "hour", 0..=23)?,
            day: parse(*day, "day", 1..=31)?,
        })
    }
}
