pub mod availability;
pub mod booking;
pub mod config;
pub mod message;
pub mod review;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use petcare_core::{Actor, CoreError, Result};
use serde::Serialize;

/// The `--as` actor, required by commands that act on someone's behalf.
pub fn require_actor(actor: Option<&Actor>) -> Result<&Actor> {
    actor.ok_or_else(|| CoreError::validation("this command needs --as <role>:<id>"))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// RFC 3339, or `YYYY-MM-DDTHH:MM` read as UTC.
pub fn parse_instant(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .map(|naive| naive.and_utc())
        .map_err(|_| format!("expected RFC 3339 or YYYY-MM-DDTHH:MM, got '{s}'"))
}

pub fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| format!("expected YYYY-MM-DD, got '{s}'"))
}
