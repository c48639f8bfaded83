//! In-process store.
//!
//! All state sits behind one mutex, so every method is atomic with respect
//! to the others.

use std::collections::HashMap;
use std::sync::Mutex;

use super::Store;
use crate::availability::{DateOverride, SitterAvailability, WeeklyRule};
use crate::booking::{Booking, BookingStatus};
use crate::error::{CoreError, Result};
use crate::message::Message;
use crate::review::Review;

#[derive(Default)]
struct Inner {
    /// Insertion order doubles as creation order.
    bookings: Vec<Booking>,
    booking_index: HashMap<String, usize>,
    availability: HashMap<String, SitterAvailability>,
    reviews: Vec<Review>,
    messages: Vec<Message>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn status_matches(booking: &Booking, status: Option<BookingStatus>) -> bool {
    status.map_or(true, |s| booking.status == s)
}

impl Store for MemoryStore {
    fn get_booking(&self, id: &str) -> Result<Option<Booking>> {
        let inner = self.inner.lock()?;
        Ok(inner.booking_index.get(id).map(|&i| inner.bookings[i].clone()))
    }

    fn save_booking(&self, booking: &Booking, expected: Option<BookingStatus>) -> Result<bool> {
        let mut inner = self.inner.lock()?;
        match expected {
            None => {
                if inner.booking_index.contains_key(&booking.id) {
                    return Err(CoreError::Duplicate(format!("booking {}", booking.id)));
                }
                if booking.status.blocks_calendar()
                    && inner.bookings.iter().any(|b| {
                        b.sitter_id == booking.sitter_id
                            && b.status.blocks_calendar()
                            && b.overlaps(booking.start_date, booking.end_date)
                    })
                {
                    return Ok(false);
                }
                let position = inner.bookings.len();
                inner.bookings.push(booking.clone());
                inner.booking_index.insert(booking.id.clone(), position);
                Ok(true)
            }
            Some(expected) => {
                let Some(&i) = inner.booking_index.get(&booking.id) else {
                    return Ok(false);
                };
                if inner.bookings[i].status != expected {
                    return Ok(false);
                }
                inner.bookings[i] = booking.clone();
                Ok(true)
            }
        }
    }

    fn list_bookings_by_sitter(
        &self,
        sitter_id: &str,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>> {
        let inner = self.inner.lock()?;
        Ok(inner
            .bookings
            .iter()
            .filter(|b| b.sitter_id == sitter_id && status_matches(b, status))
            .cloned()
            .collect())
    }

    fn list_bookings_by_owner(
        &self,
        owner_id: &str,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>> {
        let inner = self.inner.lock()?;
        Ok(inner
            .bookings
            .iter()
            .filter(|b| b.owner_id == owner_id && status_matches(b, status))
            .cloned()
            .collect())
    }

    fn get_availability(&self, sitter_id: &str) -> Result<SitterAvailability> {
        let inner = self.inner.lock()?;
        Ok(inner
            .availability
            .get(sitter_id)
            .cloned()
            .unwrap_or_else(|| SitterAvailability::empty(sitter_id)))
    }

    fn save_weekly_rule(&self, rule: &WeeklyRule) -> Result<()> {
        self.save_weekly_rules(std::slice::from_ref(rule))
    }

    fn save_weekly_rules(&self, rules: &[WeeklyRule]) -> Result<()> {
        let mut inner = self.inner.lock()?;
        for rule in rules {
            inner
                .availability
                .entry(rule.sitter_id.clone())
                .or_insert_with(|| SitterAvailability::empty(&rule.sitter_id))
                .put_weekly(rule.clone());
        }
        Ok(())
    }

    fn save_date_override(&self, date_override: &DateOverride) -> Result<()> {
        let mut inner = self.inner.lock()?;
        inner
            .availability
            .entry(date_override.sitter_id.clone())
            .or_insert_with(|| SitterAvailability::empty(&date_override.sitter_id))
            .put_override(date_override.clone());
        Ok(())
    }

    fn set_utc_offset(&self, sitter_id: &str, minutes: i32) -> Result<()> {
        let mut inner = self.inner.lock()?;
        inner
            .availability
            .entry(sitter_id.to_string())
            .or_insert_with(|| SitterAvailability::empty(sitter_id))
            .utc_offset_minutes = Some(minutes);
        Ok(())
    }

    fn get_review(&self, id: &str) -> Result<Option<Review>> {
        let inner = self.inner.lock()?;
        Ok(inner.reviews.iter().find(|r| r.id == id).cloned())
    }

    fn get_review_by_booking(&self, booking_id: &str) -> Result<Option<Review>> {
        let inner = self.inner.lock()?;
        Ok(inner.reviews.iter().find(|r| r.booking_id == booking_id).cloned())
    }

    fn save_review(&self, review: &Review) -> Result<bool> {
        let mut inner = self.inner.lock()?;
        if inner.reviews.iter().any(|r| r.booking_id == review.booking_id) {
            return Ok(false);
        }
        inner.reviews.push(review.clone());
        Ok(true)
    }

    fn update_review(&self, review: &Review) -> Result<()> {
        let mut inner = self.inner.lock()?;
        let slot = inner
            .reviews
            .iter_mut()
            .find(|r| r.id == review.id)
            .ok_or_else(|| CoreError::not_found(format!("review {}", review.id)))?;
        *slot = review.clone();
        Ok(())
    }

    fn delete_review(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.lock()?;
        inner.reviews.retain(|r| r.id != id);
        Ok(())
    }

    fn list_reviews_by_sitter(&self, sitter_id: &str) -> Result<Vec<Review>> {
        let inner = self.inner.lock()?;
        Ok(inner
            .reviews
            .iter()
            .filter(|r| r.sitter_id == sitter_id)
            .cloned()
            .collect())
    }

    fn save_message(&self, message: &Message) -> Result<()> {
        let mut inner = self.inner.lock()?;
        inner.messages.push(message.clone());
        Ok(())
    }

    fn list_messages_by_booking(&self, booking_id: &str) -> Result<Vec<Message>> {
        let inner = self.inner.lock()?;
        Ok(inner
            .messages
            .iter()
            .filter(|m| m.booking_id == booking_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::ServiceType;
    use chrono::{TimeZone, Utc};

    fn booking(id: &str) -> Booking {
        let at = |h| Utc.with_ymd_and_hms(2026, 3, 2, h, 0, 0).unwrap();
        Booking {
            id: id.to_string(),
            owner_id: "olive".into(),
            sitter_id: "sam".into(),
            pet_id: "rex".into(),
            service_type: ServiceType::Boarding,
            start_date: at(10),
            end_date: at(12),
            status: BookingStatus::Pending,
            price: 80.0,
            notes: None,
            created_at: at(8),
            updated_at: at(8),
        }
    }

    #[test]
    fn cas_applies_only_from_expected_status() {
        let store = MemoryStore::new();
        let mut b = booking("b1");
        store.save_booking(&b, None).unwrap();
        assert!(matches!(store.save_booking(&b, None), Err(CoreError::Duplicate(_))));

        b.status = BookingStatus::Rejected;
        assert!(store.save_booking(&b, Some(BookingStatus::Pending)).unwrap());
        b.status = BookingStatus::Accepted;
        assert!(!store.save_booking(&b, Some(BookingStatus::Pending)).unwrap());
        assert!(!store.save_booking(&booking("ghost"), Some(BookingStatus::Pending)).unwrap());
        assert_eq!(store.get_booking("b1").unwrap().unwrap().status, BookingStatus::Rejected);
    }

    #[test]
    fn overlapping_live_insert_is_refused() {
        let store = MemoryStore::new();
        store.save_booking(&booking("b1"), None).unwrap();
        assert!(!store.save_booking(&booking("b2"), None).unwrap());

        let mut closed = booking("b3");
        closed.status = BookingStatus::Cancelled;
        assert!(store.save_booking(&closed, None).unwrap());
    }

    #[test]
    fn unknown_sitter_has_empty_availability() {
        let store = MemoryStore::new();
        let availability = store.get_availability("nobody").unwrap();
        assert_eq!(availability, SitterAvailability::empty("nobody"));
    }
}
