use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pams")]
#[command(version)]
#[command(about = "Showcase recommendations and bookings for the PAMS marketplace", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Keep cache and bookings in memory for this invocation only
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyse a survey and recommend matching showcases
    Recommend {
        /// Survey JSON file, or an inline JSON object
        #[arg(short, long)]
        survey: String,

        /// Ignore any cached result and run the analysis again
        #[arg(long)]
        refresh: bool,

        /// Output format for the final result
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        output_format: OutputFormat,
    },
    /// Inspect or clear the recommendation cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Inspect or clear stored bookings and proposals
    Bookings {
        #[command(subcommand)]
        action: BookingsAction,
    },
    /// Initialize configuration
    Init,
    /// Show version information
    Version,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Show the cached entry
    Show,
    /// Remove the cached entry
    Clear,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum BookingsAction {
    /// List bookings and proposals
    List,
    /// Book a showcase session
    Showcase {
        #[command(flatten)]
        showcase: ShowcaseArgs,
        #[command(flatten)]
        slot: SlotArgs,
    },
    /// Book a speed-dating session
    SpeedDating {
        /// Session label, e.g. "Session A"
        #[arg(long)]
        session: String,
        #[command(flatten)]
        slot: SlotArgs,
    },
    /// Store a proposal generated from a JSON form
    Proposal {
        #[command(flatten)]
        showcase: ShowcaseArgs,
        /// Proposal form JSON file
        #[arg(long)]
        form: PathBuf,
    },
    /// Remove all bookings and proposals
    Clear,
}

/// The showcase a booking or proposal is about
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ShowcaseArgs {
    #[arg(long)]
    pub showcase_id: Option<i64>,
    #[arg(long)]
    pub title: String,
    #[arg(long, default_value = "")]
    pub artist: String,
    #[arg(long, default_value = "")]
    pub genre: String,
    #[arg(long)]
    pub duration: Option<String>,
}

/// When and where a session takes place
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SlotArgs {
    #[arg(long, default_value_t = 0)]
    pub session_id: i64,
    #[arg(long)]
    pub date: String,
    #[arg(long)]
    pub time: String,
    #[arg(long)]
    pub venue: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    Text,
    /// JSON structured output
    Json,
}
