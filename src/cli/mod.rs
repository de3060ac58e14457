/// CLI argument parsing and command handling - Gateway
mod args;
mod commands;

pub use args::{BookingsAction, CacheAction, Cli, Commands, OutputFormat, ShowcaseArgs, SlotArgs};
pub use commands::{handle_bookings, handle_cache, show_version};
