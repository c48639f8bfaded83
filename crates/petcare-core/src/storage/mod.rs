//! Persistence for bookings, availability, reviews and booking messages.
//!
//! The [`Store`] trait is the only way the booking core touches stored
//! state. Two implementations ship with the crate:
//!
//! - [`SqliteStore`]: on-disk SQLite database with versioned migrations
//! - [`MemoryStore`]: process-local maps, for tests and embedding
//!
//! Configuration lives next to the database as TOML (see [`Config`]).

mod config;
pub mod memory;
pub mod migrations;
pub mod sqlite;

pub use config::Config;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::path::PathBuf;

use crate::availability::{DateOverride, SitterAvailability, WeeklyRule};
use crate::booking::{Booking, BookingStatus};
use crate::error::{ConfigError, Result};
use crate::message::Message;
use crate::review::Review;

/// Persistence collaborator for the booking core.
///
/// Implementations must make each method atomic on its own. Cross-call
/// atomicity (check-then-insert) is provided by the caller's locking.
pub trait Store: Send + Sync {
    fn get_booking(&self, id: &str) -> Result<Option<Booking>>;

    /// Insert when `expected` is `None`; otherwise update only if the stored
    /// status still equals `expected`.
    ///
    /// An insert of a pending or accepted booking is refused when another
    /// pending or accepted booking of the same sitter overlaps it. Returns
    /// `false` when the insert was refused or the compare-and-swap update did
    /// not apply.
    fn save_booking(&self, booking: &Booking, expected: Option<BookingStatus>) -> Result<bool>;

    /// A sitter's bookings in creation order.
    fn list_bookings_by_sitter(
        &self,
        sitter_id: &str,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>>;

    /// An owner's bookings in creation order.
    fn list_bookings_by_owner(
        &self,
        owner_id: &str,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>>;

    /// Everything known about a sitter's availability; empty when nothing is stored.
    fn get_availability(&self, sitter_id: &str) -> Result<SitterAvailability>;

    /// Replace the rule for `(sitter, day)`.
    fn save_weekly_rule(&self, rule: &WeeklyRule) -> Result<()>;

    /// Replace several weekly rules for one sitter in a single write.
    fn save_weekly_rules(&self, rules: &[WeeklyRule]) -> Result<()>;

    /// Replace the override for `(sitter, date)`.
    fn save_date_override(&self, date_override: &DateOverride) -> Result<()>;

    fn set_utc_offset(&self, sitter_id: &str, minutes: i32) -> Result<()>;

    fn get_review(&self, id: &str) -> Result<Option<Review>>;

    fn get_review_by_booking(&self, booking_id: &str) -> Result<Option<Review>>;

    /// Insert a review. Returns `false` when the booking already has one.
    fn save_review(&self, review: &Review) -> Result<bool>;

    fn update_review(&self, review: &Review) -> Result<()>;

    fn delete_review(&self, id: &str) -> Result<()>;

    /// A sitter's reviews in creation order.
    fn list_reviews_by_sitter(&self, sitter_id: &str) -> Result<Vec<Review>>;

    /// Append a message to its booking's thread.
    fn save_message(&self, message: &Message) -> Result<()>;

    /// A booking's thread in posting order.
    fn list_messages_by_booking(&self, booking_id: &str) -> Result<Vec<Message>>;
}

/// Returns the data directory.
///
/// `PETCARE_DATA_DIR` wins when set. Otherwise `~/.config/petcare[-dev]/`,
/// with `PETCARE_ENV=dev` selecting the development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("PETCARE_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .or_else(dirs::config_dir)
                .ok_or(ConfigError::NoDataDir)?
                .join(".config");
            let env = std::env::var("PETCARE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("petcare-dev")
            } else {
                base_dir.join("petcare")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
