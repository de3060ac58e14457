use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use super::events::AnalysisEvent;
use super::types::SimilarityResponse;
use crate::survey::SurveyInput;
use crate::utils::AnalysisError;

/// Decoded event stream. Dropping it closes the underlying connection.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<AnalysisEvent, AnalysisError>> + Send>>;

/// The recommendation backend as seen by the client
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecommendationBackend: Send + Sync {
    /// Open the phase-1 streaming analysis for `survey`
    async fn open_analysis_stream(&self, survey: &SurveyInput)
        -> Result<EventStream, AnalysisError>;

    /// Run the phase-2 similarity search for `survey`
    async fn similarity_search(&self, survey: &SurveyInput)
        -> Result<SimilarityResponse, AnalysisError>;
}
