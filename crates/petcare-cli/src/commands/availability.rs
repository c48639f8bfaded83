//! Availability commands for CLI.

use chrono::NaiveDate;
use clap::Subcommand;
use petcare_core::{Actor, ClockTime, CoreError, DayOfWeek, PetCare, Result, TimeWindow, WeeklyRule};
use serde::Deserialize;
use serde_json::json;

use super::{parse_date, print_json, require_actor};

#[derive(Subcommand)]
pub enum AvailabilityAction {
    /// Set the weekly rule for one day
    SetWeekly {
        /// Day of week (e.g. "monday" or "mon")
        day: DayOfWeek,
        /// Window as HH:MM-HH:MM (e.g. "09:00-17:00")
        window: TimeWindow,
        /// Mark the day unavailable
        #[arg(long)]
        unavailable: bool,
        /// Sitter ID (default: the --as actor)
        #[arg(long)]
        sitter: Option<String>,
    },
    /// Replace several weekly rules at once from a JSON array, e.g.
    /// '[{"day":"monday","start":"09:00","end":"17:00"}]'
    SetWeek {
        /// JSON array of {day, start, end, available?}
        rules: String,
        /// Sitter ID (default: the --as actor)
        #[arg(long)]
        sitter: Option<String>,
    },
    /// Set an override for one date
    SetOverride {
        /// Date as YYYY-MM-DD
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
        /// Window as HH:MM-HH:MM (default: whole day)
        #[arg(long)]
        window: Option<TimeWindow>,
        /// Mark the date unavailable
        #[arg(long)]
        unavailable: bool,
        /// Sitter ID (default: the --as actor)
        #[arg(long)]
        sitter: Option<String>,
    },
    /// Set the sitter's UTC offset
    SetTimezone {
        /// Offset from UTC in minutes (e.g. -300 for UTC-05:00)
        #[arg(allow_negative_numbers = true)]
        minutes: i32,
        /// Sitter ID (default: the --as actor)
        #[arg(long)]
        sitter: Option<String>,
    },
    /// Show a sitter's weekly rules and overrides
    Show {
        /// Sitter ID
        sitter: String,
        /// First override date to include
        #[arg(long, value_parser = parse_date)]
        from: Option<NaiveDate>,
        /// Last override date to include
        #[arg(long, value_parser = parse_date)]
        to: Option<NaiveDate>,
    },
    /// Check whether a sitter is available on a date
    Check {
        /// Sitter ID
        sitter: String,
        /// Date as YYYY-MM-DD
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
        /// Window that must be covered entirely
        #[arg(long)]
        window: Option<TimeWindow>,
    },
}

fn sitter_id(sitter: Option<String>, actor: &Actor) -> String {
    sitter.unwrap_or_else(|| actor.id.clone())
}

/// One day of a `set-week` argument.
#[derive(Debug, Deserialize)]
struct WeekEntry {
    day: DayOfWeek,
    start: ClockTime,
    end: ClockTime,
    #[serde(default = "available_by_default")]
    available: bool,
}

fn available_by_default() -> bool {
    true
}

fn parse_week(sitter_id: &str, raw: &str) -> Result<Vec<WeeklyRule>> {
    let entries: Vec<WeekEntry> = serde_json::from_str(raw)
        .map_err(|e| CoreError::validation(format!("weekly rules must be a JSON array: {e}")))?;
    Ok(entries
        .into_iter()
        .map(|entry| WeeklyRule {
            sitter_id: sitter_id.to_string(),
            day_of_week: entry.day,
            start_time: entry.start,
            end_time: entry.end,
            is_available: entry.available,
        })
        .collect())
}

pub fn run(action: AvailabilityAction, actor: Option<&Actor>) -> Result<()> {
    let app = PetCare::open_default()?;
    let availability = app.availability();

    match action {
        AvailabilityAction::SetWeekly {
            day,
            window,
            unavailable,
            sitter,
        } => {
            let actor = require_actor(actor)?;
            let sitter = sitter_id(sitter, actor);
            let rule = availability.set_weekly_rule(actor, &sitter, day, window, !unavailable)?;
            print_json(&rule)?;
        }
        AvailabilityAction::SetWeek { rules, sitter } => {
            let actor = require_actor(actor)?;
            let sitter = sitter_id(sitter, actor);
            let rules = parse_week(&sitter, &rules)?;
            availability.replace_week(actor, &sitter, &rules)?;
            print_json(&availability.weekly_rules(&sitter)?)?;
        }
        AvailabilityAction::SetOverride {
            date,
            window,
            unavailable,
            sitter,
        } => {
            let actor = require_actor(actor)?;
            let sitter = sitter_id(sitter, actor);
            let date_override =
                availability.set_date_override(actor, &sitter, date, !unavailable, window)?;
            print_json(&date_override)?;
        }
        AvailabilityAction::SetTimezone { minutes, sitter } => {
            let actor = require_actor(actor)?;
            let sitter = sitter_id(sitter, actor);
            availability.set_timezone(actor, &sitter, minutes)?;
            print_json(&json!({ "sitterId": sitter, "utcOffsetMinutes": minutes }))?;
        }
        AvailabilityAction::Show { sitter, from, to } => {
            let stored = availability.availability(&sitter)?;
            let overrides = match (from, to) {
                (None, None) => stored.overrides.values().cloned().collect(),
                (from, to) => availability.overrides_between(
                    &sitter,
                    from.unwrap_or(NaiveDate::MIN),
                    to.unwrap_or(NaiveDate::MAX),
                )?,
            };
            let utc_offset_minutes = stored
                .utc_offset_minutes
                .unwrap_or(availability.default_utc_offset_minutes());
            print_json(&json!({
                "sitterId": sitter,
                "utcOffsetMinutes": utc_offset_minutes,
                "weeklyRules": stored.weekly.values().collect::<Vec<_>>(),
                "overrides": overrides,
            }))?;
        }
        AvailabilityAction::Check {
            sitter,
            date,
            window,
        } => {
            let available = availability.is_available(&sitter, date, window.as_ref())?;
            print_json(&json!({ "sitterId": sitter, "date": date, "available": available }))?;
        }
    }
    Ok(())
}
