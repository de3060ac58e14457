use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{MSG_CACHE_LOADED, MSG_PHASE1_START, PROGRESS_DONE, PROGRESS_IDLE};

/// Lifecycle of one recommendation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Phase1Streaming,
    Phase2Requesting,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }
}

/// Live progress of the two-phase pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisProgress {
    /// 1 while analysing, 2 once similarity search has begun
    pub step: u8,
    /// 0..=100, never decreases within a run
    pub percent: u8,
    pub message: String,
    /// Extracted keywords in arrival order
    pub keywords: Vec<String>,
}

impl Default for AnalysisProgress {
    fn default() -> Self {
        Self {
            step: 1,
            percent: PROGRESS_IDLE,
            message: MSG_PHASE1_START.to_string(),
            keywords: Vec::new(),
        }
    }
}

impl AnalysisProgress {
    /// Raise progress to `percent`; lower values are ignored
    pub fn advance_to(&mut self, percent: u8) {
        self.percent = self.percent.max(percent.min(PROGRESS_DONE));
    }
}

/// Outcome of the AI preference analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub status: String,
    pub keywords: Vec<String>,
    pub analysis_text: String,
}

impl AnalysisResults {
    /// Interim results while keywords are still arriving
    pub fn extracting(keywords: &[String]) -> Self {
        Self {
            status: "success".to_string(),
            keywords: keywords.to_vec(),
            analysis_text: format!("Extracting keywords: {}", keywords.join(", ")),
        }
    }

    /// Final results from the authoritative keyword list
    pub fn complete(keywords: Vec<String>) -> Self {
        let analysis_text = format!("Preference analysis complete: {}", keywords.join(", "));
        Self {
            status: "success".to_string(),
            keywords,
            analysis_text,
        }
    }
}

/// A ranked showcase recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationItem {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(rename = "similarity")]
    pub similarity_score: f64,
    /// 1-based position in the backend's response
    pub rank: usize,
    /// Remaining showcase descriptors (introduction, venue, schedule, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Match percentage shown next to a recommendation
pub fn match_score(similarity: f64) -> u8 {
    if similarity.is_nan() {
        return 0;
    }
    (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Showcase as returned by the similarity-search endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowcasePayload {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredShowcase {
    pub showcase: ShowcasePayload,
    pub similarity_score: f64,
}

/// Body of a successful similarity-search response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResponse {
    #[serde(default)]
    pub recommendations: Vec<ScoredShowcase>,
}

impl SimilarityResponse {
    /// Convert to recommendation items ranked 1..=N in response order
    pub fn into_ranked(self) -> Vec<RecommendationItem> {
        self.recommendations
            .into_iter()
            .enumerate()
            .map(|(index, scored)| RecommendationItem {
                id: scored.showcase.id,
                title: scored.showcase.title,
                artist: scored.showcase.artist,
                genre: scored.showcase.genre,
                duration: scored.showcase.duration,
                similarity_score: scored.similarity_score,
                rank: index + 1,
                extra: scored.showcase.extra,
            })
            .collect()
    }
}

/// Everything the view layer needs to render a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSnapshot {
    pub state: RunState,
    pub progress: AnalysisProgress,
    /// Latest inference text streamed by the model
    pub partial_text: String,
    pub full_response: Option<String>,
    pub analysis: Option<AnalysisResults>,
    /// Empty until the run completes
    pub recommendations: Vec<RecommendationItem>,
    pub error: Option<String>,
    pub from_cache: bool,
}

impl Default for AnalysisSnapshot {
    fn default() -> Self {
        Self {
            state: RunState::Idle,
            progress: AnalysisProgress::default(),
            partial_text: String::new(),
            full_response: None,
            analysis: None,
            recommendations: Vec::new(),
            error: None,
            from_cache: false,
        }
    }
}

impl AnalysisSnapshot {
    /// Snapshot of a run answered from the cache
    pub fn from_cache(
        recommendations: Vec<RecommendationItem>,
        analysis: Option<AnalysisResults>,
        full_response: String,
    ) -> Self {
        let keywords = analysis
            .as_ref()
            .map(|a| a.keywords.clone())
            .unwrap_or_default();
        Self {
            state: RunState::Completed,
            progress: AnalysisProgress {
                step: 2,
                percent: PROGRESS_DONE,
                message: MSG_CACHE_LOADED.to_string(),
                keywords,
            },
            partial_text: String::new(),
            full_response: Some(full_response),
            analysis,
            recommendations,
            error: None,
            from_cache: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_progress_never_decreases() {
        let mut progress = AnalysisProgress::default();
        progress.advance_to(40);
        progress.advance_to(36);
        assert_eq!(progress.percent, 40);
        progress.advance_to(250);
        assert_eq!(progress.percent, 100);
    }

    #[test]
    fn test_ranks_follow_response_order() {
        let body = r#"{
            "step": 2,
            "recommendations": [
                {"showcase": {"id": 7, "title": "BARCODE", "artist": "A", "genre": "dance",
                              "duration": "60", "venue": "Hall B"},
                 "similarity_score": 0.91},
                {"showcase": {"id": 3, "title": "Light Trees", "artist": "B", "genre": "music"},
                 "similarity_score": 0.87},
                {"showcase": {"id": 9, "title": "Swipe!", "artist": "C", "genre": "theater"},
                 "similarity_score": 0.95}
            ]
        }"#;
        let response: SimilarityResponse = serde_json::from_str(body).unwrap();
        let items = response.into_ranked();

        let ranks: Vec<usize> = items.iter().map(|i| i.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(items[2].title, "Swipe!");
        assert_eq!(items[0].extra.get("venue"), Some(&Value::from("Hall B")));
    }

    #[test]
    fn test_item_keeps_showcase_snapshot_in_json() {
        let response: SimilarityResponse = serde_json::from_str(
            r#"{"recommendations":[{"showcase":{"title":"in:out","introduction":"..."},"similarity_score":0.5}]}"#,
        )
        .unwrap();
        let item = response.into_ranked().remove(0);

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["similarity"], Value::from(0.5));
        assert_eq!(json["introduction"], Value::from("..."));

        let back: RecommendationItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_match_score() {
        assert_eq!(match_score(0.876), 88);
        assert_eq!(match_score(1.4), 100);
        assert_eq!(match_score(-0.2), 0);
        assert_eq!(match_score(f64::NAN), 0);
    }

    #[test]
    fn test_cached_snapshot_restores_keywords() {
        let analysis = AnalysisResults::complete(vec!["dance".into(), "traditional".into()]);
        let snapshot = AnalysisSnapshot::from_cache(Vec::new(), Some(analysis), "full".into());

        assert_eq!(snapshot.state, RunState::Completed);
        assert_eq!(snapshot.progress.percent, 100);
        assert_eq!(snapshot.progress.keywords, vec!["dance", "traditional"]);
        assert!(snapshot.from_cache);
    }
}
