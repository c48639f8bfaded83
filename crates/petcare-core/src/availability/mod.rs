//! Sitter availability: recurring weekly rules and date-specific overrides.
//!
//! ## Resolution order
//!
//! ```text
//! date override for D?  ──yes──> use it exclusively
//!        │ no
//!        v
//! weekly rule for weekday(D)?  ──yes──> use it
//!        │ no
//!        v
//!   unavailable
//! ```
//!
//! Wall-clock values (`HH:MM`, dates) are local to the sitter. Each sitter's
//! availability carries the UTC offset that local time is measured in.

pub mod store;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, FixedOffset, NaiveDate, NaiveTime, Offset, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub use store::AvailabilityStore;

const MINUTES_PER_DAY: u16 = 24 * 60;

/// Largest UTC offset accepted for a sitter, in minutes.
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts full names and three-letter abbreviations, case-insensitive.
impl FromStr for DayOfWeek {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        DayOfWeek::ALL
            .into_iter()
            .find(|d| d.as_str() == lower || &d.as_str()[..3] == lower.as_str())
            .ok_or_else(|| CoreError::validation(format!("unknown day of week: {s}")))
    }
}

/// Local wall-clock time with minute precision.
///
/// `24:00` is representable so that a window can end at midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u16);

impl ClockTime {
    pub const MIDNIGHT: ClockTime = ClockTime(0);
    pub const END_OF_DAY: ClockTime = ClockTime(MINUTES_PER_DAY);

    pub fn new(hour: u16, minute: u16) -> Result<Self, CoreError> {
        if minute >= 60 || hour > 24 || (hour == 24 && minute != 0) {
            return Err(CoreError::validation(format!(
                "time out of range: {hour:02}:{minute:02}"
            )));
        }
        Ok(ClockTime(hour * 60 + minute))
    }

    pub fn minutes(&self) -> u16 {
        self.0
    }

    /// Rounds down to the minute.
    pub fn floor(time: NaiveTime) -> Self {
        ClockTime((time.hour() * 60 + time.minute()) as u16)
    }

    /// Rounds up to the next whole minute when seconds are present.
    pub fn ceil(time: NaiveTime) -> Self {
        let floor = Self::floor(time);
        if time.second() > 0 || time.nanosecond() > 0 {
            ClockTime(floor.0 + 1)
        } else {
            floor
        }
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for ClockTime {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::validation(format!("time must be HH:MM, got '{s}'"));
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if h.len() != 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour: u16 = h.parse().map_err(|_| invalid())?;
        let minute: u16 = m.parse().map_err(|_| invalid())?;
        ClockTime::new(hour, minute)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

/// Half-open local time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl TimeWindow {
    pub const WHOLE_DAY: TimeWindow = TimeWindow {
        start: ClockTime::MIDNIGHT,
        end: ClockTime::END_OF_DAY,
    };

    /// Builds a window, rejecting empty or inverted ranges.
    pub fn new(start: ClockTime, end: ClockTime) -> Result<Self, CoreError> {
        let window = TimeWindow { start, end };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.start >= self.end {
            return Err(CoreError::validation(format!(
                "start time {} must be before end time {}",
                self.start, self.end
            )));
        }
        Ok(())
    }

    /// True when `other` lies entirely inside this window.
    pub fn contains(&self, other: &TimeWindow) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for TimeWindow {
    type Err = CoreError;

    /// Parses `HH:MM-HH:MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s.split_once('-').ok_or_else(|| {
            CoreError::validation(format!("window must be HH:MM-HH:MM, got '{s}'"))
        })?;
        TimeWindow::new(start.parse()?, end.parse()?)
    }
}

/// Recurring availability for one day of the week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyRule {
    pub sitter_id: String,
    pub day_of_week: DayOfWeek,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub is_available: bool,
}

impl WeeklyRule {
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_time,
            end: self.end_time,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.is_available {
            self.window().validate()?;
        }
        Ok(())
    }
}

/// One-off exception to the weekly rule for a single local date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateOverride {
    pub sitter_id: String,
    pub date: NaiveDate,
    pub is_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<ClockTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<ClockTime>,
}

impl DateOverride {
    /// The bookable window; the whole day when no hours are given.
    pub fn window(&self) -> TimeWindow {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => TimeWindow { start, end },
            _ => TimeWindow::WHOLE_DAY,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => TimeWindow { start, end }.validate(),
            (None, None) => Ok(()),
            _ => Err(CoreError::validation(
                "date override needs both start and end time, or neither",
            )),
        }
    }
}

/// Where a resolved availability answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Override,
    Weekly,
    Default,
}

/// Outcome of resolving a single date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDay {
    pub source: Resolution,
    /// `None` when the sitter is unavailable all day.
    pub window: Option<TimeWindow>,
}

/// A sitter's full availability as read from storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitterAvailability {
    pub sitter_id: String,
    /// Offset of the sitter's local clock from UTC; `None` means the
    /// configured default applies.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
    #[serde(default)]
    pub weekly: BTreeMap<DayOfWeek, WeeklyRule>,
    #[serde(default)]
    pub overrides: BTreeMap<NaiveDate, DateOverride>,
}

impl SitterAvailability {
    pub fn empty(sitter_id: impl Into<String>) -> Self {
        Self {
            sitter_id: sitter_id.into(),
            ..Self::default()
        }
    }

    /// Replaces the rule for the rule's day.
    pub fn put_weekly(&mut self, rule: WeeklyRule) {
        self.weekly.insert(rule.day_of_week, rule);
    }

    /// Replaces the override for the override's date.
    pub fn put_override(&mut self, date_override: DateOverride) {
        self.overrides.insert(date_override.date, date_override);
    }

    pub fn resolve(&self, date: NaiveDate) -> ResolvedDay {
        if let Some(o) = self.overrides.get(&date) {
            return ResolvedDay {
                source: Resolution::Override,
                window: o.is_available.then(|| o.window()),
            };
        }
        if let Some(rule) = self.weekly.get(&DayOfWeek::of(date)) {
            return ResolvedDay {
                source: Resolution::Weekly,
                window: rule.is_available.then(|| rule.window()),
            };
        }
        ResolvedDay {
            source: Resolution::Default,
            window: None,
        }
    }

    /// Whether the sitter is available on `date`, for the whole of `window`
    /// when one is given.
    pub fn is_available(&self, date: NaiveDate, window: Option<&TimeWindow>) -> bool {
        match (self.resolve(date).window, window) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(available), Some(requested)) => available.contains(requested),
        }
    }

    pub fn offset(&self, default_minutes: i32) -> FixedOffset {
        let minutes = self.utc_offset_minutes.unwrap_or(default_minutes);
        offset_from_minutes(minutes).unwrap_or_else(|_| Utc.fix())
    }
}

pub fn offset_from_minutes(minutes: i32) -> Result<FixedOffset, CoreError> {
    if minutes.abs() > MAX_UTC_OFFSET_MINUTES {
        return Err(CoreError::validation(format!(
            "utc offset {minutes} minutes is out of range"
        )));
    }
    FixedOffset::east_opt(minutes * 60)
        .ok_or_else(|| CoreError::validation(format!("invalid utc offset: {minutes}")))
}
