//! Booking conversation commands for CLI.

use clap::Subcommand;
use petcare_core::{Actor, PetCare, Result};

use super::{print_json, require_actor};

#[derive(Subcommand)]
pub enum MessageAction {
    /// Post to a booking's conversation
    Post {
        /// Booking ID
        booking: String,
        /// Message text
        content: String,
    },
    /// Show a booking's conversation, oldest first
    List {
        /// Booking ID
        booking: String,
    },
}

pub fn run(action: MessageAction, actor: Option<&Actor>) -> Result<()> {
    let app = PetCare::open_default()?;
    let actor = require_actor(actor)?;
    let messages = app.messages();

    match action {
        MessageAction::Post { booking, content } => {
            print_json(&messages.post_message(actor, &booking, &content)?)?;
        }
        MessageAction::List { booking } => {
            print_json(&messages.booking_messages(actor, &booking)?)?;
        }
    }
    Ok(())
}
