pub mod analysis;
pub mod app;
pub mod bookings;
pub mod cache;
pub mod cli;
pub mod constants;
pub mod runtime;
pub mod storage;
pub mod survey;
pub mod utils;

pub use analysis::{AnalysisSnapshot, RecommendationBackend, StreamingAnalysisClient};
pub use app::{load_config, Config};
pub use bookings::BookingStore;
pub use cache::RecommendationCache;
pub use survey::SurveyInput;
pub use utils::{AnalysisError, PamsError};
