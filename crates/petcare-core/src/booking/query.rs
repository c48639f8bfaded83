//! Read-only booking listings.

use serde::{Deserialize, Serialize};

use super::{Booking, BookingStatus};
use crate::actor::{Actor, Role};
use crate::error::Result;
use crate::storage::Store;

/// Which side of the booking `user_id` is on, optionally narrowed by status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingFilter {
    pub role: Role,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BookingStatus>,
}

impl BookingFilter {
    pub fn owner(user_id: impl Into<String>) -> Self {
        Self {
            role: Role::Owner,
            user_id: user_id.into(),
            status: None,
        }
    }

    pub fn sitter(user_id: impl Into<String>) -> Self {
        Self {
            role: Role::Sitter,
            user_id: user_id.into(),
            status: None,
        }
    }

    /// The bookings `actor` is a party to.
    pub fn for_actor(actor: &Actor) -> Self {
        Self {
            role: actor.role,
            user_id: actor.id.clone(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: BookingStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// A listing is readable only by the user it names, on the side it names.
    pub fn visible_to(&self, actor: &Actor) -> bool {
        self.role == actor.role && self.user_id == actor.id
    }
}

/// Bookings matching `filter`, oldest first.
pub fn list_bookings(store: &dyn Store, filter: &BookingFilter) -> Result<Vec<Booking>> {
    match filter.role {
        Role::Owner => store.list_bookings_by_owner(&filter.user_id, filter.status),
        Role::Sitter => store.list_bookings_by_sitter(&filter.user_id, filter.status),
    }
}
