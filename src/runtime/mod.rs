/// Runtime orchestrator module - Gateway

mod orchestrator;
mod render;

pub use orchestrator::Orchestrator;
pub use render::{format_json, format_progress, format_results, ProgressPrinter};
