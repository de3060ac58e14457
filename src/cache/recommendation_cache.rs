use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::types::CacheEntry;
use crate::constants::{CACHE_TTL_HOURS, RECOMMENDATION_CACHE_KEY};
use crate::storage::KeyValueStore;
use crate::survey::SurveyInput;

/// Single-slot cache of the last completed recommendation run.
///
/// Every failure here is logged and swallowed: a broken cache reads as a
/// miss and a failed write leaves the run's result untouched.
#[derive(Clone)]
pub struct RecommendationCache {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl RecommendationCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            ttl: Duration::hours(CACHE_TTL_HOURS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Valid entry for `survey`, if any
    pub fn load(&self, survey: &SurveyInput) -> Option<CacheEntry> {
        self.load_at(survey, Utc::now().timestamp_millis())
    }

    /// Valid entry for `survey` as of `now_millis`
    pub fn load_at(&self, survey: &SurveyInput, now_millis: i64) -> Option<CacheEntry> {
        let entry = self.peek()?;

        if entry.age_millis(now_millis) >= self.ttl.num_milliseconds() {
            debug!("Recommendation cache expired, discarding");
            self.clear();
            return None;
        }

        // A different survey leaves the old entry in place but unused
        if entry.survey_hash != survey.fingerprint() {
            debug!("Recommendation cache belongs to a different survey");
            return None;
        }

        Some(entry)
    }

    /// The stored entry regardless of age or survey
    pub fn peek(&self) -> Option<CacheEntry> {
        let raw = match self.store.get(RECOMMENDATION_CACHE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read recommendation cache: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Recommendation cache is corrupt, discarding: {}", e);
                self.clear();
                None
            }
        }
    }

    /// Replace the cached entry
    pub fn save(&self, entry: &CacheEntry) {
        let serialized = match serde_json::to_string(entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize recommendation cache: {}", e);
                return;
            }
        };

        match self.store.set(RECOMMENDATION_CACHE_KEY, &serialized) {
            Ok(()) => info!(
                "Cached {} recommendations",
                entry.recommendations.len()
            ),
            Err(e) => warn!("Failed to save recommendation cache: {}", e),
        }
    }

    /// Drop the cached entry
    pub fn clear(&self) {
        if let Err(e) = self.store.remove(RECOMMENDATION_CACHE_KEY) {
            warn!("Failed to clear recommendation cache: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisResults, RecommendationItem};
    use crate::storage::MemoryStore;
    use pretty_assertions::assert_eq;

    fn item(rank: usize, title: &str) -> RecommendationItem {
        RecommendationItem {
            id: Some(rank as i64),
            title: title.to_string(),
            artist: "artist".to_string(),
            genre: "dance".to_string(),
            duration: Some("60".to_string()),
            similarity_score: 0.9,
            rank,
            extra: Default::default(),
        }
    }

    fn survey() -> SurveyInput {
        SurveyInput::new().with_text("firstName", "Kim")
    }

    fn cache_with_store() -> (RecommendationCache, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (RecommendationCache::new(store.clone()), store)
    }

    fn entry_for(survey: &SurveyInput) -> CacheEntry {
        CacheEntry::new(
            survey,
            vec![item(1, "BARCODE"), item(2, "Swipe!")],
            Some(AnalysisResults::complete(vec!["dance".into()])),
            "full response".to_string(),
        )
    }

    #[test]
    fn test_hit_for_same_survey() {
        let (cache, _) = cache_with_store();
        let entry = entry_for(&survey());
        cache.save(&entry);

        assert_eq!(cache.load(&survey()), Some(entry));
    }

    #[test]
    fn test_miss_for_changed_survey_keeps_entry() {
        let (cache, store) = cache_with_store();
        cache.save(&entry_for(&survey()));

        let other = survey().with_text("lastName", "Park");
        assert_eq!(cache.load(&other), None);
        assert!(store.get(RECOMMENDATION_CACHE_KEY).unwrap().is_some());
        assert!(cache.load(&survey()).is_some());
    }

    #[test]
    fn test_expired_entry_is_absent_and_removed() {
        let (cache, store) = cache_with_store();
        let mut entry = entry_for(&survey());
        let now = Utc::now().timestamp_millis();
        entry.timestamp = now - Duration::hours(25).num_milliseconds();
        cache.save(&entry);

        assert_eq!(cache.load_at(&survey(), now), None);
        assert!(store.get(RECOMMENDATION_CACHE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_entry_just_inside_ttl_is_valid() {
        let (cache, _) = cache_with_store();
        let entry = entry_for(&survey());
        cache.save(&entry);

        let almost_a_day = entry.timestamp + Duration::hours(24).num_milliseconds() - 1;
        assert!(cache.load_at(&survey(), almost_a_day).is_some());
        let a_day = entry.timestamp + Duration::hours(24).num_milliseconds();
        assert!(cache.load_at(&survey(), a_day).is_none());
    }

    #[test]
    fn test_corrupt_entry_reads_as_miss() {
        let (cache, store) = cache_with_store();
        store.set(RECOMMENDATION_CACHE_KEY, "{not json").unwrap();

        assert_eq!(cache.load(&survey()), None);
        assert!(store.get(RECOMMENDATION_CACHE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_quota_failure_is_swallowed() {
        let store = Arc::new(MemoryStore::with_quota(16));
        let cache = RecommendationCache::new(store.clone());

        cache.save(&entry_for(&survey()));
        assert!(store.is_empty());
        assert_eq!(cache.load(&survey()), None);
    }

    #[test]
    fn test_persisted_layout() {
        let (cache, store) = cache_with_store();
        cache.save(&entry_for(&survey()));

        let raw = store.get(RECOMMENDATION_CACHE_KEY).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        for key in ["timestamp", "surveyHash", "recommendations", "analysisResults", "exaoneFullResponse"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["recommendations"][1]["rank"], 2);
    }

    #[test]
    fn test_clear() {
        let (cache, _) = cache_with_store();
        cache.save(&entry_for(&survey()));
        cache.clear();
        assert_eq!(cache.peek(), None);
    }
}
