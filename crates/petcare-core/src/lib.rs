//! # PetCare Core Library
//!
//! Booking core for a pet-care marketplace: owners request bookings with
//! sitters, sitters publish when they can work and answer requests, owners
//! review completed bookings. The CLI binary is a thin caller boundary over
//! this library.
//!
//! ## Architecture
//!
//! - **Availability**: weekly rules plus per-date overrides, resolved in the
//!   sitter's own UTC offset
//! - **Bookings**: conflict checking, a closed status table with per-edge
//!   role authority, and listings
//! - **Reviews**: one review per completed booking
//! - **Messages**: the conversation attached to each booking, open to its
//!   two parties only
//! - **Storage**: the [`Store`] trait with SQLite and in-memory
//!   implementations, TOML configuration
//!
//! ## Key Components
//!
//! - [`PetCare`]: all services over one shared store
//! - [`BookingService`]: create / transition / cancel bookings
//! - [`AvailabilityStore`]: sitter availability
//! - [`ReviewGate`]: review creation and upkeep
//! - [`MessageThread`]: booking conversations
//! - [`CoreError`]: error taxonomy reported at the caller boundary

pub mod actor;
pub mod availability;
pub mod booking;
pub mod error;
pub mod message;
pub mod review;
pub mod storage;

use std::sync::Arc;

pub use actor::{Actor, Role};
pub use availability::{
    AvailabilityStore, ClockTime, DateOverride, DayOfWeek, SitterAvailability, TimeWindow,
    WeeklyRule,
};
pub use booking::{
    Booking, BookingFilter, BookingRequest, BookingService, BookingStatus, ConflictCheck,
    ConflictChecker, ServiceType,
};
pub use error::{ConfigError, ConflictReason, CoreError, DatabaseError, Result};
pub use message::{Message, MessageThread};
pub use review::{RatingSummary, Review, ReviewGate};
pub use storage::{Config, MemoryStore, SqliteStore, Store};

/// Every service, sharing one store and one configuration.
pub struct PetCare {
    config: Config,
    availability: AvailabilityStore,
    bookings: BookingService,
    reviews: ReviewGate,
    messages: MessageThread,
}

impl PetCare {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let offset = config.availability.default_utc_offset_minutes;
        Self {
            availability: AvailabilityStore::new(store.clone(), offset),
            bookings: BookingService::new(store.clone(), offset, config.booking.max_duration_days),
            reviews: ReviewGate::new(store.clone(), config.review.max_comment_len),
            messages: MessageThread::new(store, config.message.max_len),
            config,
        }
    }

    /// Load `config.toml` and open the SQLite database in the data directory.
    ///
    /// # Errors
    /// Returns an error if the configuration is unreadable or the database
    /// cannot be opened or migrated.
    pub fn open_default() -> Result<Self> {
        let config = Config::load()?;
        let store = SqliteStore::open_default(&config)?;
        Ok(Self::new(Arc::new(store), config))
    }

    /// Default configuration over a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Config::default())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn availability(&self) -> &AvailabilityStore {
        &self.availability
    }

    pub fn bookings(&self) -> &BookingService {
        &self.bookings
    }

    pub fn reviews(&self) -> &ReviewGate {
        &self.reviews
    }

    pub fn messages(&self) -> &MessageThread {
        &self.messages
    }
}
