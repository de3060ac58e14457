use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisResults, RecommendationItem};
use crate::survey::SurveyInput;

/// The single cached result of the last completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Creation time, epoch milliseconds
    pub timestamp: i64,
    /// Fingerprint of the survey that produced this entry
    pub survey_hash: String,
    pub recommendations: Vec<RecommendationItem>,
    #[serde(default)]
    pub analysis_results: Option<AnalysisResults>,
    #[serde(rename = "exaoneFullResponse", default)]
    pub full_response: String,
}

impl CacheEntry {
    /// Build an entry for `survey`, stamped with the current time
    pub fn new(
        survey: &SurveyInput,
        recommendations: Vec<RecommendationItem>,
        analysis_results: Option<AnalysisResults>,
        full_response: String,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
            survey_hash: survey.fingerprint(),
            recommendations,
            analysis_results,
            full_response,
        }
    }

    /// Age in milliseconds relative to `now_millis`
    pub fn age_millis(&self, now_millis: i64) -> i64 {
        now_millis - self.timestamp
    }
}
