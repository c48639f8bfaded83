//! The conversation attached to a booking.
//!
//! Every booking carries one thread. Only the booking's owner and sitter can
//! read it or post to it; to anyone else the booking does not exist.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::actor::{Actor, Role};
use crate::booking::Booking;
use crate::error::{CoreError, Result};
use crate::storage::Store;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub booking_id: String,
    pub sender_id: String,
    pub sender_role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

pub struct MessageThread {
    store: Arc<dyn Store>,
    max_len: usize,
}

impl MessageThread {
    pub fn new(store: Arc<dyn Store>, max_len: usize) -> Self {
        Self { store, max_len }
    }

    fn party_booking(&self, actor: &Actor, booking_id: &str) -> Result<Booking> {
        match self.store.get_booking(booking_id)? {
            Some(booking) if booking.is_party(actor) => Ok(booking),
            _ => Err(CoreError::not_found(format!("booking {booking_id}"))),
        }
    }

    /// Append `content` to the booking's thread.
    ///
    /// # Errors
    /// `Validation` for blank or overlong content, `NotFound` when the booking
    /// does not exist or `actor` is not one of its parties.
    pub fn post_message(&self, actor: &Actor, booking_id: &str, content: &str) -> Result<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(CoreError::validation("message must not be empty"));
        }
        if self.max_len > 0 && content.chars().count() > self.max_len {
            return Err(CoreError::validation(format!(
                "message exceeds {} characters",
                self.max_len
            )));
        }
        let booking = self.party_booking(actor, booking_id)?;

        let message = Message {
            id: Uuid::new_v4().to_string(),
            booking_id: booking.id,
            sender_id: actor.id.clone(),
            sender_role: actor.role,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.store.save_message(&message)?;
        info!(message_id = %message.id, booking_id, sender = %actor, "message posted");
        Ok(message)
    }

    /// The booking's thread, oldest first.
    pub fn booking_messages(&self, actor: &Actor, booking_id: &str) -> Result<Vec<Message>> {
        self.party_booking(actor, booking_id)?;
        self.store.list_messages_by_booking(booking_id)
    }
}
