//! Decides whether a sitter can take a window.
//!
//! Two checks run in order:
//!
//! 1. every local date the window touches must be available, for the slice
//!    of the window falling on that date (`outside_availability`)
//! 2. no pending or accepted booking of the sitter may intersect the window
//!    (`overlapping_booking`)
//!
//! The checker only reads. Callers that act on its answer must hold the
//! sitter's creation lock across the check and the write.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ServiceType;
use crate::availability::{ClockTime, SitterAvailability, TimeWindow};
use crate::error::{ConflictReason, CoreError, Result};
use crate::storage::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictCheck {
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ConflictReason>,
}

impl ConflictCheck {
    pub const AVAILABLE: ConflictCheck = ConflictCheck {
        available: true,
        reason: None,
    };

    pub fn blocked(reason: ConflictReason) -> Self {
        Self {
            available: false,
            reason: Some(reason),
        }
    }

    /// `Ok` when available, otherwise the matching `Conflict` error.
    pub fn into_result(self) -> Result<()> {
        match self.reason {
            None => Ok(()),
            Some(reason) => Err(CoreError::Conflict(reason)),
        }
    }
}

pub struct ConflictChecker {
    store: Arc<dyn Store>,
    default_utc_offset_minutes: i32,
}

impl ConflictChecker {
    pub fn new(store: Arc<dyn Store>, default_utc_offset_minutes: i32) -> Self {
        Self {
            store,
            default_utc_offset_minutes,
        }
    }

    /// Check `[start, end)` for `sitter_id`, ignoring `exclude_booking_id`.
    ///
    /// # Errors
    /// `Validation` when `start >= end`; storage errors otherwise.
    pub fn check_conflict(
        &self,
        sitter_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        service_type: ServiceType,
        exclude_booking_id: Option<&str>,
    ) -> Result<ConflictCheck> {
        if start >= end {
            return Err(CoreError::validation("window start must be before its end"));
        }

        let availability = self.store.get_availability(sitter_id)?;
        let offset = availability.offset(self.default_utc_offset_minutes);
        if !covers(&availability, start, end, service_type, offset) {
            debug!(sitter_id, %start, %end, "window outside availability");
            return Ok(ConflictCheck::blocked(ConflictReason::OutsideAvailability));
        }

        let clash = self
            .store
            .list_bookings_by_sitter(sitter_id, None)?
            .into_iter()
            .filter(|b| b.status.blocks_calendar())
            .filter(|b| exclude_booking_id != Some(b.id.as_str()))
            .find(|b| b.overlaps(start, end));
        if let Some(existing) = clash {
            debug!(sitter_id, existing = %existing.id, "window overlaps booking");
            return Ok(ConflictCheck::blocked(ConflictReason::OverlappingBooking));
        }

        Ok(ConflictCheck::AVAILABLE)
    }
}

/// Whether `availability` admits `[start, end)` for the given service.
///
/// Overnight services need each touched date to be available; other
/// services need each date's slice to fit inside that date's hours.
pub fn covers(
    availability: &SitterAvailability,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    service_type: ServiceType,
    offset: FixedOffset,
) -> bool {
    local_slices(start, end, offset)
        .iter()
        .all(|(date, slice)| {
            if service_type.is_overnight() {
                availability.is_available(*date, None)
            } else {
                availability.is_available(*date, Some(slice))
            }
        })
}

/// Split `[start, end)` into per-date local windows.
///
/// Dates whose slice would be empty (a window ending exactly at midnight)
/// are left out.
pub fn local_slices(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    offset: FixedOffset,
) -> Vec<(NaiveDate, TimeWindow)> {
    let local_start = start.with_timezone(&offset).naive_local();
    let local_end = end.with_timezone(&offset).naive_local();

    let mut slices = Vec::new();
    let mut date = local_start.date();
    loop {
        let slice_start = if date == local_start.date() {
            ClockTime::floor(local_start.time())
        } else {
            ClockTime::MIDNIGHT
        };
        let slice_end = if date == local_end.date() {
            ClockTime::ceil(local_end.time())
        } else {
            ClockTime::END_OF_DAY
        };
        if slice_start < slice_end {
            slices.push((
                date,
                TimeWindow {
                    start: slice_start,
                    end: slice_end,
                },
            ));
        }
        if date >= local_end.date() {
            break;
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    slices
}
