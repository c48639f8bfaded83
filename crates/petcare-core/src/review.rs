//! Reviews of completed bookings.
//!
//! A booking can carry at most one review, written by the booking's owner
//! once the booking is `completed`. Uniqueness is enforced by the store so
//! that two concurrent submissions cannot both land.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::actor::Actor;
use crate::booking::BookingStatus;
use crate::error::{CoreError, Result};
use crate::storage::Store;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub booking_id: String,
    pub owner_id: String,
    pub sitter_id: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate of a sitter's reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub sitter_id: String,
    pub count: usize,
    /// `None` until the first review.
    pub average: Option<f64>,
}

pub struct ReviewGate {
    store: Arc<dyn Store>,
    max_comment_len: usize,
}

impl ReviewGate {
    pub fn new(store: Arc<dyn Store>, max_comment_len: usize) -> Self {
        Self {
            store,
            max_comment_len,
        }
    }

    fn validate(&self, rating: i64, comment: &str) -> Result<u8> {
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(CoreError::validation(format!(
                "rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
            )));
        }
        if self.max_comment_len > 0 && comment.chars().count() > self.max_comment_len {
            return Err(CoreError::validation(format!(
                "comment exceeds {} characters",
                self.max_comment_len
            )));
        }
        Ok(rating as u8)
    }

    /// Record the owner's review of a completed booking.
    ///
    /// # Errors
    /// `Validation` for a rating outside 1..=5, then in order `NotFound`,
    /// `InvalidState` (not completed), `Forbidden` (not the booking's owner),
    /// `Duplicate` (already reviewed).
    pub fn create_review(
        &self,
        owner: &Actor,
        booking_id: &str,
        rating: i64,
        comment: &str,
    ) -> Result<Review> {
        let rating = self.validate(rating, comment)?;

        let booking = self
            .store
            .get_booking(booking_id)?
            .ok_or_else(|| CoreError::not_found(format!("booking {booking_id}")))?;

        if booking.status != BookingStatus::Completed {
            return Err(CoreError::InvalidState(format!(
                "booking {booking_id} is {}, only completed bookings can be reviewed",
                booking.status
            )));
        }
        if !owner.is_owner(&booking.owner_id) {
            return Err(CoreError::forbidden(format!(
                "{owner} is not the owner of booking {booking_id}"
            )));
        }
        if self.store.get_review_by_booking(booking_id)?.is_some() {
            return Err(duplicate(booking_id));
        }

        let now = Utc::now();
        let review = Review {
            id: Uuid::new_v4().to_string(),
            booking_id: booking.id.clone(),
            owner_id: booking.owner_id.clone(),
            sitter_id: booking.sitter_id.clone(),
            rating,
            comment: comment.to_string(),
            created_at: now,
            updated_at: now,
        };
        if !self.store.save_review(&review)? {
            warn!(booking_id, "lost race to review booking");
            return Err(duplicate(booking_id));
        }
        info!(review_id = %review.id, booking_id, rating, "review created");
        Ok(review)
    }

    pub fn review_for_booking(&self, booking_id: &str) -> Result<Option<Review>> {
        self.store.get_review_by_booking(booking_id)
    }

    /// Reviews of a sitter, oldest first.
    pub fn reviews_for_sitter(&self, sitter_id: &str) -> Result<Vec<Review>> {
        self.store.list_reviews_by_sitter(sitter_id)
    }

    pub fn rating_summary(&self, sitter_id: &str) -> Result<RatingSummary> {
        let reviews = self.store.list_reviews_by_sitter(sitter_id)?;
        let count = reviews.len();
        let average = (count > 0).then(|| {
            reviews.iter().map(|r| f64::from(r.rating)).sum::<f64>() / count as f64
        });
        Ok(RatingSummary {
            sitter_id: sitter_id.to_string(),
            count,
            average,
        })
    }

    /// Change rating and comment. Only the author may edit.
    pub fn update_review(
        &self,
        owner: &Actor,
        review_id: &str,
        rating: i64,
        comment: &str,
    ) -> Result<Review> {
        let rating = self.validate(rating, comment)?;
        let mut review = self.authored_review(owner, review_id)?;
        review.rating = rating;
        review.comment = comment.to_string();
        review.updated_at = Utc::now();
        self.store.update_review(&review)?;
        info!(review_id, rating, "review updated");
        Ok(review)
    }

    /// Remove a review; the booking may then be reviewed again.
    pub fn delete_review(&self, owner: &Actor, review_id: &str) -> Result<()> {
        self.authored_review(owner, review_id)?;
        self.store.delete_review(review_id)?;
        info!(review_id, "review deleted");
        Ok(())
    }

    fn authored_review(&self, owner: &Actor, review_id: &str) -> Result<Review> {
        let review = self
            .store
            .get_review(review_id)?
            .ok_or_else(|| CoreError::not_found(format!("review {review_id}")))?;
        if !owner.is_owner(&review.owner_id) {
            return Err(CoreError::forbidden(format!(
                "{owner} did not write review {review_id}"
            )));
        }
        Ok(review)
    }
}

fn duplicate(booking_id: &str) -> CoreError {
    CoreError::Duplicate(format!("booking {booking_id} already has a review"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{Booking, ServiceType};
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    fn seeded(status: BookingStatus) -> (Arc<dyn Store>, ReviewGate) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let at = |h| Utc.with_ymd_and_hms(2026, 3, 2, h, 0, 0).unwrap();
        let booking = Booking {
            id: "b1".into(),
            owner_id: "olive".into(),
            sitter_id: "sam".into(),
            pet_id: "rex".into(),
            service_type: ServiceType::Sitting,
            start_date: at(10),
            end_date: at(12),
            status,
            price: 30.0,
            notes: None,
            created_at: at(8),
            updated_at: at(8),
        };
        store.save_booking(&booking, None).unwrap();
        let gate = ReviewGate::new(store.clone(), 100);
        (store, gate)
    }

    #[test]
    fn owner_reviews_completed_booking_once() {
        let (_, gate) = seeded(BookingStatus::Completed);
        let olive = Actor::owner("olive");
        let review = gate.create_review(&olive, "b1", 5, "great").unwrap();
        assert_eq!(review.sitter_id, "sam");
        assert_eq!(review.rating, 5);

        let again = gate.create_review(&olive, "b1", 4, "still great");
        assert!(matches!(again, Err(CoreError::Duplicate(_))));
    }

    #[test]
    fn rating_is_validated_before_lookup() {
        let (_, gate) = seeded(BookingStatus::Completed);
        let olive = Actor::owner("olive");
        assert!(matches!(
            gate.create_review(&olive, "missing", 0, ""),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            gate.create_review(&olive, "b1", 6, ""),
            Err(CoreError::Validation(_))
        ));
        let long = "x".repeat(101);
        assert!(matches!(
            gate.create_review(&olive, "b1", 3, &long),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn precondition_errors() {
        let (_, gate) = seeded(BookingStatus::Accepted);
        let olive = Actor::owner("olive");
        assert!(matches!(
            gate.create_review(&olive, "nope", 3, ""),
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            gate.create_review(&olive, "b1", 3, ""),
            Err(CoreError::InvalidState(_))
        ));

        let (_, gate) = seeded(BookingStatus::Completed);
        assert!(matches!(
            gate.create_review(&Actor::owner("someone"), "b1", 3, ""),
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            gate.create_review(&Actor::sitter("sam"), "b1", 3, ""),
            Err(CoreError::Forbidden(_))
        ));
    }

    #[test]
    fn summary_and_edits() {
        let (_, gate) = seeded(BookingStatus::Completed);
        let olive = Actor::owner("olive");
        let empty = gate.rating_summary("sam").unwrap();
        assert_eq!(empty.count, 0);
        assert_eq!(empty.average, None);

        let review = gate.create_review(&olive, "b1", 2, "meh").unwrap();
        let updated = gate.update_review(&olive, &review.id, 4, "better").unwrap();
        assert_eq!(updated.rating, 4);
        assert_eq!(gate.rating_summary("sam").unwrap().average, Some(4.0));

        assert!(matches!(
            gate.update_review(&Actor::owner("mallory"), &review.id, 1, ""),
            Err(CoreError::Forbidden(_))
        ));

        gate.delete_review(&olive, &review.id).unwrap();
        assert!(gate.review_for_booking("b1").unwrap().is_none());
        assert!(gate.create_review(&olive, "b1", 5, "again").is_ok());
    }
}
