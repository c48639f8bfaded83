//! Review commands for CLI.

use clap::Subcommand;
use petcare_core::{Actor, CoreError, PetCare, Result};

use super::{print_json, require_actor};

#[derive(Subcommand)]
pub enum ReviewAction {
    /// Review a completed booking (as its owner)
    Create {
        /// Booking ID
        booking: String,
        /// Rating from 1 to 5
        #[arg(allow_negative_numbers = true)]
        rating: i64,
        /// Free-text comment
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Get the review of a booking
    Get {
        /// Booking ID
        booking: String,
    },
    /// List a sitter's reviews
    List {
        /// Sitter ID
        sitter: String,
    },
    /// Review count and average rating of a sitter
    Summary {
        /// Sitter ID
        sitter: String,
    },
    /// Change a review you wrote
    Update {
        /// Review ID
        id: String,
        /// Rating from 1 to 5
        #[arg(allow_negative_numbers = true)]
        rating: i64,
        /// Free-text comment
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Delete a review you wrote
    Delete {
        /// Review ID
        id: String,
    },
}

pub fn run(action: ReviewAction, actor: Option<&Actor>) -> Result<()> {
    let app = PetCare::open_default()?;
    let reviews = app.reviews();

    match action {
        ReviewAction::Create {
            booking,
            rating,
            comment,
        } => {
            let review = reviews.create_review(require_actor(actor)?, &booking, rating, &comment)?;
            print_json(&review)?;
        }
        ReviewAction::Get { booking } => {
            let review = reviews
                .review_for_booking(&booking)?
                .ok_or_else(|| CoreError::not_found(format!("review for booking {booking}")))?;
            print_json(&review)?;
        }
        ReviewAction::List { sitter } => {
            print_json(&reviews.reviews_for_sitter(&sitter)?)?;
        }
        ReviewAction::Summary { sitter } => {
            print_json(&reviews.rating_summary(&sitter)?)?;
        }
        ReviewAction::Update {
            id,
            rating,
            comment,
        } => {
            let review = reviews.update_review(require_actor(actor)?, &id, rating, &comment)?;
            print_json(&review)?;
        }
        ReviewAction::Delete { id } => {
            reviews.delete_review(require_actor(actor)?, &id)?;
            print_json(&serde_json::json!({ "deleted": id }))?;
        }
    }
    Ok(())
}
