//! Booking commands for CLI.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use petcare_core::{
    Actor, BookingFilter, BookingRequest, BookingStatus, PetCare, Result, Role, ServiceType,
};

use super::{parse_instant, print_json, require_actor};

#[derive(Subcommand)]
pub enum BookingAction {
    /// Request a booking (as an owner)
    Create {
        /// Sitter ID
        #[arg(long)]
        sitter: String,
        /// Pet ID
        #[arg(long)]
        pet: String,
        /// Service: walking, boarding or sitting
        #[arg(long)]
        service: ServiceType,
        /// Start, RFC 3339 or YYYY-MM-DDTHH:MM (UTC)
        #[arg(long, value_parser = parse_instant)]
        start: DateTime<Utc>,
        /// End, exclusive
        #[arg(long, value_parser = parse_instant)]
        end: DateTime<Utc>,
        /// Agreed price
        #[arg(long)]
        price: f64,
        /// Notes for the sitter
        #[arg(long)]
        notes: Option<String>,
    },
    /// Move a booking to a new status
    Status {
        /// Booking ID
        id: String,
        /// Target status: accepted, rejected, cancelled or completed
        status: BookingStatus,
    },
    /// Cancel a booking
    Cancel {
        /// Booking ID
        id: String,
    },
    /// Get booking details
    Get {
        /// Booking ID
        id: String,
    },
    /// List bookings
    List {
        /// Filter by status
        #[arg(long)]
        status: Option<BookingStatus>,
        /// Side to list; must match the --as actor
        #[arg(long)]
        role: Option<Role>,
        /// User to list for; must match the --as actor
        #[arg(long)]
        user: Option<String>,
    },
    /// Check whether a sitter can take a window
    Check {
        /// Sitter ID
        #[arg(long)]
        sitter: String,
        /// Start, RFC 3339 or YYYY-MM-DDTHH:MM (UTC)
        #[arg(long, value_parser = parse_instant)]
        start: DateTime<Utc>,
        /// End, exclusive
        #[arg(long, value_parser = parse_instant)]
        end: DateTime<Utc>,
        /// Service: walking, boarding or sitting
        #[arg(long, default_value = "walking")]
        service: ServiceType,
        /// Booking to ignore when scanning for overlaps
        #[arg(long)]
        exclude: Option<String>,
    },
}

/// The `--as` actor's own listing unless `--role` / `--user` name another.
fn list_filter(
    actor: &Actor,
    role: Option<Role>,
    user: Option<String>,
    status: Option<BookingStatus>,
) -> BookingFilter {
    let mut filter = BookingFilter::for_actor(actor);
    if let Some(role) = role {
        filter.role = role;
    }
    if let Some(user) = user {
        filter.user_id = user;
    }
    filter.status = status;
    filter
}

pub fn run(action: BookingAction, actor: Option<&Actor>) -> Result<()> {
    let app = PetCare::open_default()?;
    let bookings = app.bookings();

    match action {
        BookingAction::Create {
            sitter,
            pet,
            service,
            start,
            end,
            price,
            notes,
        } => {
            let actor = require_actor(actor)?;
            let booking = bookings.create(
                actor,
                BookingRequest {
                    sitter_id: sitter,
                    pet_id: pet,
                    service_type: service,
                    start_date: start,
                    end_date: end,
                    price,
                    notes,
                },
            )?;
            print_json(&booking)?;
        }
        BookingAction::Status { id, status } => {
            let booking = bookings.transition(require_actor(actor)?, &id, status)?;
            print_json(&booking)?;
        }
        BookingAction::Cancel { id } => {
            let booking = bookings.cancel(require_actor(actor)?, &id)?;
            print_json(&booking)?;
        }
        BookingAction::Get { id } => {
            let booking = bookings.get(require_actor(actor)?, &id)?;
            print_json(&booking)?;
        }
        BookingAction::List { status, role, user } => {
            let actor = require_actor(actor)?;
            let filter = list_filter(actor, role, user, status);
            print_json(&bookings.list(actor, &filter)?)?;
        }
        BookingAction::Check {
            sitter,
            start,
            end,
            service,
            exclude,
        } => {
            let check = bookings.check_conflict(&sitter, start, end, service, exclude.as_deref())?;
            print_json(&check)?;
        }
    }
    Ok(())
}
