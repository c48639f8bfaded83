//! Sitter-owned availability operations.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use super::{
    offset_from_minutes, DateOverride, DayOfWeek, SitterAvailability, TimeWindow, WeeklyRule,
};
use crate::actor::Actor;
use crate::error::{CoreError, Result};
use crate::storage::Store;

/// Reads and writes a sitter's weekly rules and date overrides.
///
/// Writes are only accepted from the sitter the availability belongs to.
pub struct AvailabilityStore {
    store: Arc<dyn Store>,
    default_utc_offset_minutes: i32,
}

impl AvailabilityStore {
    pub fn new(store: Arc<dyn Store>, default_utc_offset_minutes: i32) -> Self {
        Self {
            store,
            default_utc_offset_minutes,
        }
    }

    pub fn default_utc_offset_minutes(&self) -> i32 {
        self.default_utc_offset_minutes
    }

    fn authorize(actor: &Actor, sitter_id: &str) -> Result<()> {
        if !actor.is_sitter(sitter_id) {
            return Err(CoreError::forbidden(format!(
                "{actor} may not change availability of sitter {sitter_id}"
            )));
        }
        Ok(())
    }

    /// Replace the rule for `(sitter, day)`.
    ///
    /// # Errors
    /// `Validation` when the window is empty or inverted and `is_available`
    /// is set; `Forbidden` when the actor is not that sitter.
    pub fn set_weekly_rule(
        &self,
        actor: &Actor,
        sitter_id: &str,
        day: DayOfWeek,
        window: TimeWindow,
        is_available: bool,
    ) -> Result<WeeklyRule> {
        let rule = WeeklyRule {
            sitter_id: sitter_id.to_string(),
            day_of_week: day,
            start_time: window.start,
            end_time: window.end,
            is_available,
        };
        rule.validate()?;
        Self::authorize(actor, sitter_id)?;
        self.store.save_weekly_rule(&rule)?;
        info!(sitter_id, day = %day, window = %window, is_available, "weekly rule set");
        Ok(rule)
    }

    /// Replace several days at once; nothing is written if any rule is invalid.
    pub fn replace_week(
        &self,
        actor: &Actor,
        sitter_id: &str,
        rules: &[WeeklyRule],
    ) -> Result<()> {
        for rule in rules {
            if rule.sitter_id != sitter_id {
                return Err(CoreError::validation(format!(
                    "rule for {} submitted under sitter {sitter_id}",
                    rule.sitter_id
                )));
            }
            rule.validate()?;
        }
        Self::authorize(actor, sitter_id)?;
        self.store.save_weekly_rules(rules)?;
        info!(sitter_id, days = rules.len(), "weekly rules replaced");
        Ok(())
    }

    /// Replace the override for `(sitter, date)`.
    pub fn set_date_override(
        &self,
        actor: &Actor,
        sitter_id: &str,
        date: NaiveDate,
        is_available: bool,
        window: Option<TimeWindow>,
    ) -> Result<DateOverride> {
        let date_override = DateOverride {
            sitter_id: sitter_id.to_string(),
            date,
            is_available,
            start_time: window.map(|w| w.start),
            end_time: window.map(|w| w.end),
        };
        date_override.validate()?;
        Self::authorize(actor, sitter_id)?;
        self.store.save_date_override(&date_override)?;
        info!(sitter_id, %date, is_available, "date override set");
        Ok(date_override)
    }

    /// Set the UTC offset the sitter's wall-clock values are measured in.
    pub fn set_timezone(
        &self,
        actor: &Actor,
        sitter_id: &str,
        utc_offset_minutes: i32,
    ) -> Result<()> {
        offset_from_minutes(utc_offset_minutes)?;
        Self::authorize(actor, sitter_id)?;
        self.store.set_utc_offset(sitter_id, utc_offset_minutes)?;
        info!(sitter_id, utc_offset_minutes, "sitter timezone set");
        Ok(())
    }

    /// Whether the sitter is available on `date`, for the entire `window` if given.
    pub fn is_available(
        &self,
        sitter_id: &str,
        date: NaiveDate,
        window: Option<&TimeWindow>,
    ) -> Result<bool> {
        Ok(self.store.get_availability(sitter_id)?.is_available(date, window))
    }

    pub fn availability(&self, sitter_id: &str) -> Result<SitterAvailability> {
        self.store.get_availability(sitter_id)
    }

    /// The sitter's weekly rules, Monday first.
    pub fn weekly_rules(&self, sitter_id: &str) -> Result<Vec<WeeklyRule>> {
        Ok(self
            .store
            .get_availability(sitter_id)?
            .weekly
            .into_values()
            .collect())
    }

    /// Overrides dated within `from..=to`, earliest first.
    pub fn overrides_between(
        &self,
        sitter_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DateOverride>> {
        if from > to {
            return Err(CoreError::validation(format!("{from} is after {to}")));
        }
        Ok(self
            .store
            .get_availability(sitter_id)?
            .overrides
            .range(from..=to)
            .map(|(_, o)| o.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn service() -> AvailabilityStore {
        AvailabilityStore::new(Arc::new(MemoryStore::new()), 0)
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn window(s: &str) -> TimeWindow {
        s.parse().unwrap()
    }

    #[test]
    fn only_the_sitter_writes_their_availability() {
        let svc = service();
        let owner = Actor::owner("sam");
        let err = svc
            .set_weekly_rule(&owner, "sam", DayOfWeek::Monday, window("09:00-17:00"), true)
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
        let err = svc
            .set_date_override(&Actor::sitter("other"), "sam", date(2), false, None)
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }

    #[test]
    fn inverted_window_fails_validation_when_available() {
        let svc = service();
        let sam = Actor::sitter("sam");
        let inverted = TimeWindow {
            start: "17:00".parse().unwrap(),
            end: "09:00".parse().unwrap(),
        };
        assert!(matches!(
            svc.set_weekly_rule(&sam, "sam", DayOfWeek::Monday, inverted, true),
            Err(CoreError::Validation(_))
        ));
        assert!(svc
            .set_weekly_rule(&sam, "sam", DayOfWeek::Monday, inverted, false)
            .is_ok());
    }

    #[test]
    fn override_takes_precedence() {
        let svc = service();
        let sam = Actor::sitter("sam");
        svc.set_weekly_rule(&sam, "sam", DayOfWeek::Monday, window("09:00-17:00"), true)
            .unwrap();
        assert!(svc.is_available("sam", date(2), Some(&window("10:00-12:00"))).unwrap());

        svc.set_date_override(&sam, "sam", date(2), false, None).unwrap();
        assert!(!svc.is_available("sam", date(2), None).unwrap());
        // The following Monday still follows the weekly rule.
        assert!(svc.is_available("sam", date(9), None).unwrap());
    }

    #[test]
    fn replace_week_is_all_or_nothing() {
        let svc = service();
        let sam = Actor::sitter("sam");
        let rule = |day, start: &str, end: &str| WeeklyRule {
            sitter_id: "sam".into(),
            day_of_week: day,
            start_time: start.parse().unwrap(),
            end_time: end.parse().unwrap(),
            is_available: true,
        };
        let bad = [
            rule(DayOfWeek::Tuesday, "09:00", "12:00"),
            rule(DayOfWeek::Monday, "12:00", "09:00"),
        ];
        assert!(svc.replace_week(&sam, "sam", &bad).is_err());
        assert!(svc.weekly_rules("sam").unwrap().is_empty());

        let good = [
            rule(DayOfWeek::Tuesday, "09:00", "12:00"),
            rule(DayOfWeek::Monday, "08:00", "09:00"),
        ];
        svc.replace_week(&sam, "sam", &good).unwrap();
        let days: Vec<_> = svc
            .weekly_rules("sam")
            .unwrap()
            .into_iter()
            .map(|r| r.day_of_week)
            .collect();
        assert_eq!(days, [DayOfWeek::Monday, DayOfWeek::Tuesday]);
    }

    #[test]
    fn overrides_between_is_inclusive() {
        let svc = service();
        let sam = Actor::sitter("sam");
        for d in [1, 5, 10] {
            svc.set_date_override(&sam, "sam", date(d), true, None).unwrap();
        }
        let found: Vec<_> = svc
            .overrides_between("sam", date(5), date(10))
            .unwrap()
            .into_iter()
            .map(|o| o.date)
            .collect();
        assert_eq!(found, [date(5), date(10)]);
        assert!(svc.overrides_between("sam", date(10), date(5)).is_err());
    }

    #[test]
    fn timezone_is_range_checked() {
        let svc = service();
        let sam = Actor::sitter("sam");
        svc.set_timezone(&sam, "sam", 330).unwrap();
        assert_eq!(svc.availability("sam").unwrap().utc_offset_minutes, Some(330));
        assert!(matches!(
            svc.set_timezone(&sam, "sam", 24 * 60),
            Err(CoreError::Validation(_))
        ));
    }
}
