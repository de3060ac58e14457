mod recommendation_cache;
mod types;

pub use recommendation_cache::RecommendationCache;
pub use types::CacheEntry;
