//! Bookings and their lifecycle.
//!
//! ## State Transitions
//!
//! ```text
//!            ┌──> accepted ──┬──> completed
//!            │               └──> cancelled
//! pending ───┼──> rejected
//!            └──> cancelled
//! ```
//!
//! `rejected`, `cancelled` and `completed` are terminal. Nothing re-enters
//! `pending`.

pub mod conflict;
pub mod lifecycle;
pub mod query;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actor::{Actor, Role};
use crate::error::CoreError;

pub use conflict::{ConflictCheck, ConflictChecker};
pub use lifecycle::BookingService;
pub use query::BookingFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Walking,
    Boarding,
    Sitting,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Walking => "walking",
            ServiceType::Boarding => "boarding",
            ServiceType::Sitting => "sitting",
        }
    }

    /// Overnight services are checked per day, not against hours.
    pub fn is_overnight(&self) -> bool {
        matches!(self, ServiceType::Boarding)
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "walking" => Ok(ServiceType::Walking),
            "boarding" => Ok(ServiceType::Boarding),
            "sitting" => Ok(ServiceType::Sitting),
            other => Err(CoreError::validation(format!("unknown service type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Accepted,
        BookingStatus::Rejected,
        BookingStatus::Cancelled,
        BookingStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    /// Get valid next states for this state.
    pub fn valid_transitions(&self) -> &'static [BookingStatus] {
        match self {
            BookingStatus::Pending => &[
                BookingStatus::Accepted,
                BookingStatus::Rejected,
                BookingStatus::Cancelled,
            ],
            BookingStatus::Accepted => &[BookingStatus::Completed, BookingStatus::Cancelled],
            BookingStatus::Rejected | BookingStatus::Cancelled | BookingStatus::Completed => &[],
        }
    }

    pub fn can_transition_to(&self, to: BookingStatus) -> bool {
        self.valid_transitions().contains(&to)
    }

    pub fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }

    /// Statuses that hold the sitter's time.
    pub fn blocks_calendar(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Accepted)
    }

    /// Roles allowed to move a booking from this state to `to`.
    ///
    /// Empty when the edge is not legal.
    pub fn permitted_roles(&self, to: BookingStatus) -> &'static [Role] {
        use BookingStatus::*;
        match (self, to) {
            (Pending, Accepted) | (Pending, Rejected) | (Accepted, Completed) => &[Role::Sitter],
            (Pending, Cancelled) => &[Role::Owner],
            (Accepted, Cancelled) => &[Role::Owner, Role::Sitter],
            _ => &[],
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == lower)
            .ok_or_else(|| CoreError::validation(format!("unknown booking status: {s}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub owner_id: String,
    pub sitter_id: String,
    pub pet_id: String,
    pub service_type: ServiceType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: BookingStatus,
    /// Fixed at creation.
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Half-open interval intersection with `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_date < end && self.end_date > start
    }

    /// True when the actor is this booking's owner or sitter.
    pub fn is_party(&self, actor: &Actor) -> bool {
        actor.is_owner(&self.owner_id) || actor.is_sitter(&self.sitter_id)
    }

    /// The actor's authority for moving this booking to `to`.
    pub fn may_transition(&self, actor: &Actor, to: BookingStatus) -> bool {
        self.status.permitted_roles(to).iter().any(|role| match role {
            Role::Owner => actor.is_owner(&self.owner_id),
            Role::Sitter => actor.is_sitter(&self.sitter_id),
        })
    }
}

/// What an owner submits to request a booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub sitter_id: String,
    pub pet_id: String,
    pub service_type: ServiceType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub price: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl BookingRequest {
    /// Structural checks that do not depend on stored state.
    pub fn validate(&self, max_duration_days: u32) -> Result<(), CoreError> {
        if self.sitter_id.trim().is_empty() {
            return Err(CoreError::validation("sitterId must not be empty"));
        }
        if self.pet_id.trim().is_empty() {
            return Err(CoreError::validation("petId must not be empty"));
        }
        if self.start_date >= self.end_date {
            return Err(CoreError::validation(format!(
                "startDate ({}) must be before endDate ({})",
                self.start_date.to_rfc3339(),
                self.end_date.to_rfc3339()
            )));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(CoreError::validation(format!(
                "price must be a non-negative amount, got {}",
                self.price
            )));
        }
        if max_duration_days > 0
            && self.end_date - self.start_date > chrono::Duration::days(max_duration_days as i64)
        {
            return Err(CoreError::validation(format!(
                "booking may not exceed {max_duration_days} days"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, 0, 0).unwrap()
    }

    fn booking(status: BookingStatus) -> Booking {
        Booking {
            id: "b1".into(),
            owner_id: "olive".into(),
            sitter_id: "sam".into(),
            pet_id: "rex".into(),
            service_type: ServiceType::Walking,
            start_date: at(10),
            end_date: at(12),
            status,
            price: 40.0,
            notes: None,
            created_at: at(8),
            updated_at: at(8),
        }
    }

    fn request() -> BookingRequest {
        BookingRequest {
            sitter_id: "sam".into(),
            pet_id: "rex".into(),
            service_type: ServiceType::Walking,
            start_date: at(10),
            end_date: at(12),
            price: 40.0,
            notes: None,
        }
    }

    #[test]
    fn transition_table() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Accepted));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Completed));
        assert!(Accepted.can_transition_to(Completed));
        assert!(Accepted.can_transition_to(Cancelled));
        assert!(!Accepted.can_transition_to(Rejected));
        for terminal in [Rejected, Cancelled, Completed] {
            assert!(terminal.is_terminal());
            for to in BookingStatus::ALL {
                assert!(!terminal.can_transition_to(to));
            }
        }
        for from in BookingStatus::ALL {
            assert!(!from.can_transition_to(Pending));
        }
    }

    #[test]
    fn permitted_roles_only_on_legal_edges() {
        for from in BookingStatus::ALL {
            for to in BookingStatus::ALL {
                assert_eq!(from.can_transition_to(to), !from.permitted_roles(to).is_empty());
            }
        }
    }

    #[test]
    fn only_assigned_parties_may_transition() {
        let pending = booking(BookingStatus::Pending);
        assert!(pending.may_transition(&Actor::sitter("sam"), BookingStatus::Accepted));
        assert!(!pending.may_transition(&Actor::sitter("other"), BookingStatus::Accepted));
        assert!(!pending.may_transition(&Actor::owner("olive"), BookingStatus::Accepted));
        assert!(pending.may_transition(&Actor::owner("olive"), BookingStatus::Cancelled));
        assert!(!pending.may_transition(&Actor::sitter("sam"), BookingStatus::Cancelled));

        let accepted = booking(BookingStatus::Accepted);
        assert!(accepted.may_transition(&Actor::sitter("sam"), BookingStatus::Cancelled));
        assert!(accepted.may_transition(&Actor::owner("olive"), BookingStatus::Cancelled));
        assert!(!accepted.may_transition(&Actor::owner("olive"), BookingStatus::Completed));
    }

    #[test]
    fn overlap_is_half_open() {
        let b = booking(BookingStatus::Pending);
        assert!(b.overlaps(at(11), at(13)));
        assert!(b.overlaps(at(9), at(11)));
        assert!(!b.overlaps(at(12), at(14)));
        assert!(!b.overlaps(at(8), at(10)));
    }

    #[test]
    fn blocking_statuses() {
        assert!(BookingStatus::Pending.blocks_calendar());
        assert!(BookingStatus::Accepted.blocks_calendar());
        assert!(!BookingStatus::Rejected.blocks_calendar());
        assert!(!BookingStatus::Cancelled.blocks_calendar());
        assert!(!BookingStatus::Completed.blocks_calendar());
    }

    #[test]
    fn request_validation() {
        assert!(request().validate(30).is_ok());

        let mut inverted = request();
        inverted.end_date = inverted.start_date;
        assert!(matches!(inverted.validate(30), Err(CoreError::Validation(_))));

        let mut negative = request();
        negative.price = -1.0;
        assert!(negative.validate(30).is_err());

        let mut nan = request();
        nan.price = f64::NAN;
        assert!(nan.validate(30).is_err());

        let mut long = request();
        long.end_date = long.start_date + chrono::Duration::days(31);
        assert!(long.validate(30).is_err());
        assert!(long.validate(0).is_ok());

        let mut no_pet = request();
        no_pet.pet_id = " ".into();
        assert!(no_pet.validate(30).is_err());
    }

    #[test]
    fn wire_names_are_camel_case() {
        let json = serde_json::to_value(booking(BookingStatus::Pending)).unwrap();
        assert_eq!(json["sitterId"], "sam");
        assert_eq!(json["serviceType"], "walking");
        assert_eq!(json["status"], "pending");
        assert!(json.get("notes").is_none());
    }
}
