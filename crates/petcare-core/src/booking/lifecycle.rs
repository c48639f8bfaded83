//! Booking creation and status changes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::conflict::{ConflictCheck, ConflictChecker};
use super::query::{list_bookings, BookingFilter};
use super::{Booking, BookingRequest, BookingStatus, ServiceType};
use crate::actor::{Actor, Role};
use crate::error::{ConflictReason, CoreError, Result};
use crate::storage::Store;

/// Creates bookings and moves them through the status table.
///
/// Creation for one sitter is serialized by a per-sitter lock held across the
/// conflict check and the insert. The store also refuses an overlapping
/// insert, which covers writers in other processes. Status changes are
/// compare-and-swap on the stored status, so of two racing transitions at
/// most one applies.
pub struct BookingService {
    store: Arc<dyn Store>,
    checker: ConflictChecker,
    max_duration_days: u32,
    sitter_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn Store>,
        default_utc_offset_minutes: i32,
        max_duration_days: u32,
    ) -> Self {
        Self {
            checker: ConflictChecker::new(store.clone(), default_utc_offset_minutes),
            store,
            max_duration_days,
            sitter_locks: Mutex::new(HashMap::new()),
        }
    }

    fn sitter_lock(&self, sitter_id: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self.sitter_locks.lock()?;
        Ok(locks.entry(sitter_id.to_string()).or_default().clone())
    }

    /// Drop the sitter's entry once no other creation holds or awaits it.
    ///
    /// Clones are only handed out under the map lock, so a count of two
    /// (the map and `lock`) means nobody else can reach this mutex.
    fn release_sitter_lock(&self, sitter_id: &str, lock: Arc<Mutex<()>>) -> Result<()> {
        let mut locks = self.sitter_locks.lock()?;
        if Arc::strong_count(&lock) == 2 {
            locks.remove(sitter_id);
        }
        Ok(())
    }

    /// Request a booking on behalf of `owner`.
    ///
    /// # Errors
    /// `Validation` for malformed requests, `Forbidden` when the actor is not
    /// an owner, `Conflict` when the sitter cannot take the window.
    pub fn create(&self, owner: &Actor, request: BookingRequest) -> Result<Booking> {
        request.validate(self.max_duration_days)?;
        if owner.role != Role::Owner {
            return Err(CoreError::forbidden(format!("{owner} may not request bookings")));
        }

        let sitter_id = request.sitter_id.clone();
        let lock = self.sitter_lock(&sitter_id)?;
        let created = match lock.lock() {
            Ok(_guard) => self.create_locked(owner, request),
            Err(poisoned) => Err(poisoned.into()),
        };
        self.release_sitter_lock(&sitter_id, lock)?;
        created
    }

    /// Check and insert while the sitter's creation lock is held.
    fn create_locked(&self, owner: &Actor, request: BookingRequest) -> Result<Booking> {
        self.checker
            .check_conflict(
                &request.sitter_id,
                request.start_date,
                request.end_date,
                request.service_type,
                None,
            )?
            .into_result()
            .inspect_err(|err| {
                warn!(owner = %owner, sitter_id = %request.sitter_id, %err, "booking refused");
            })?;

        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4().to_string(),
            owner_id: owner.id.clone(),
            sitter_id: request.sitter_id,
            pet_id: request.pet_id,
            service_type: request.service_type,
            start_date: request.start_date,
            end_date: request.end_date,
            status: BookingStatus::Pending,
            price: request.price,
            notes: request.notes.filter(|n| !n.trim().is_empty()),
            created_at: now,
            updated_at: now,
        };
        if !self.store.save_booking(&booking, None)? {
            warn!(sitter_id = %booking.sitter_id, "overlapping booking stored concurrently");
            return Err(CoreError::Conflict(ConflictReason::OverlappingBooking));
        }

        info!(
            booking_id = %booking.id,
            owner_id = %booking.owner_id,
            sitter_id = %booking.sitter_id,
            service = %booking.service_type,
            "booking created"
        );
        Ok(booking)
    }

    /// Move a booking to `target`.
    ///
    /// # Errors
    /// `NotFound` when the booking does not exist, `InvalidTransition` when
    /// the edge is illegal or another update got there first, `Forbidden`
    /// when the actor's role may not take this edge.
    pub fn transition(
        &self,
        actor: &Actor,
        booking_id: &str,
        target: BookingStatus,
    ) -> Result<Booking> {
        let booking = self
            .store
            .get_booking(booking_id)?
            .ok_or_else(|| CoreError::not_found(format!("booking {booking_id}")))?;

        let from = booking.status;
        if !from.can_transition_to(target) {
            return Err(CoreError::InvalidTransition { from, to: target });
        }
        if !booking.may_transition(actor, target) {
            return Err(CoreError::forbidden(format!(
                "{actor} may not move booking {booking_id} from {from} to {target}"
            )));
        }

        let updated = Booking {
            status: target,
            updated_at: Utc::now(),
            ..booking
        };
        if !self.store.save_booking(&updated, Some(from))? {
            let current = self
                .store
                .get_booking(booking_id)?
                .map_or(from, |b| b.status);
            warn!(booking_id, %from, %current, to = %target, "status changed concurrently");
            return Err(CoreError::InvalidTransition {
                from: current,
                to: target,
            });
        }

        info!(booking_id, %from, to = %target, actor = %actor, "booking transitioned");
        Ok(updated)
    }

    /// Shorthand for a transition to `cancelled`.
    pub fn cancel(&self, actor: &Actor, booking_id: &str) -> Result<Booking> {
        self.transition(actor, booking_id, BookingStatus::Cancelled)
    }

    /// Fetch a booking visible to `actor`.
    ///
    /// Bookings the actor is not a party to are reported as missing.
    pub fn get(&self, actor: &Actor, booking_id: &str) -> Result<Booking> {
        match self.store.get_booking(booking_id)? {
            Some(booking) if booking.is_party(actor) => Ok(booking),
            _ => Err(CoreError::not_found(format!("booking {booking_id}"))),
        }
    }

    /// List the bookings `filter` selects.
    ///
    /// # Errors
    /// `Forbidden` unless the filter names the actor's own side and id.
    pub fn list(&self, actor: &Actor, filter: &BookingFilter) -> Result<Vec<Booking>> {
        if !filter.visible_to(actor) {
            return Err(CoreError::forbidden(format!(
                "{actor} may not list bookings of {} {}",
                filter.role, filter.user_id
            )));
        }
        list_bookings(self.store.as_ref(), filter)
    }

    pub fn check_conflict(
        &self,
        sitter_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        service_type: ServiceType,
        exclude_booking_id: Option<&str>,
    ) -> Result<ConflictCheck> {
        self.checker
            .check_conflict(sitter_id, start, end, service_type, exclude_booking_id)
    }
}
