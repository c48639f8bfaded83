use clap::{Parser, Subcommand};
use petcare_core::{Actor, CoreError};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "petcare-cli", version, about = "PetCare booking CLI")]
struct Cli {
    /// Act as `<role>:<id>`, e.g. `owner:olive` or `sitter:sam`
    #[arg(long = "as", global = true, value_name = "ROLE:ID")]
    actor: Option<Actor>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sitter availability
    Availability {
        #[command(subcommand)]
        action: commands::availability::AvailabilityAction,
    },
    /// Booking requests and their status
    Booking {
        #[command(subcommand)]
        action: commands::booking::BookingAction,
    },
    /// Reviews of completed bookings
    Review {
        #[command(subcommand)]
        action: commands::review::ReviewAction,
    },
    /// Conversations attached to bookings
    Message {
        #[command(subcommand)]
        action: commands::message::MessageAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PETCARE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Exit status for a failed command. Usage errors from clap exit with 2,
/// which validation failures share.
fn exit_code(err: &CoreError) -> i32 {
    match err {
        CoreError::Validation(_) => 2,
        CoreError::Forbidden(_) => 3,
        CoreError::NotFound(_) => 4,
        CoreError::Conflict(_) => 5,
        CoreError::InvalidTransition { .. } => 6,
        CoreError::InvalidState(_) => 7,
        CoreError::Duplicate(_) => 8,
        CoreError::Database(_)
        | CoreError::Config(_)
        | CoreError::Io(_)
        | CoreError::Json(_) => 1,
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let actor = cli.actor.as_ref();
    let result = match cli.command {
        Commands::Availability { action } => commands::availability::run(action, actor),
        Commands::Booking { action } => commands::booking::run(action, actor),
        Commands::Review { action } => commands::review::run(action, actor),
        Commands::Message { action } => commands::message::run(action, actor),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error[{}] ({}): {e}", e.kind(), e.status_code());
        std::process::exit(exit_code(&e));
    }
}
