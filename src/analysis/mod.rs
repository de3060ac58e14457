// Gateway module for analysis - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod client;
mod events;
mod http;
mod transport;
mod types;

// Public re-exports - the ONLY way to access analysis functionality
pub use client::{ClientSettings, SnapshotCallback, StreamingAnalysisClient};
pub use events::{decode_event, AnalysisEvent, SseDecoder};
pub use http::HttpBackend;
pub use transport::{EventStream, RecommendationBackend};
pub use types::{
    match_score, AnalysisProgress, AnalysisResults, AnalysisSnapshot, RecommendationItem,
    RunState, ScoredShowcase, ShowcasePayload, SimilarityResponse,
};
