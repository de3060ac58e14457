/// Constants module to avoid magic numbers in the codebase

// Network Configuration
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const STREAM_ANALYSIS_PATH: &str = "/api/recommendation/stream-analysis";
pub const SIMILARITY_SEARCH_PATH: &str = "/api/recommendation/step-by-step";
pub const SIMILARITY_SEARCH_STEP: u8 = 2;

// Timeouts
pub const STREAM_TIMEOUT_SECS: u64 = 30;
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const PROGRESS_CHECKPOINT_INTERVAL_MS: u64 = 1000;
pub const MIN_PROGRESS_CHECKPOINT_INTERVAL_MS: u64 = 1;
pub const MAX_STREAM_TIMEOUT_SECS: u64 = 3600;

// Storage keys
pub const RECOMMENDATION_CACHE_KEY: &str = "recommendationCache";
pub const BOOKING_DATA_KEY: &str = "pams_booking_data";

// Cache
pub const CACHE_TTL_HOURS: i64 = 24;
pub const MAX_CACHE_TTL_HOURS: i64 = 24 * 365;

// Progress checkpoints (percent)
pub const PROGRESS_IDLE: u8 = 0;
pub const PROGRESS_PHASE1_START: u8 = 10;
pub const PROGRESS_STATUS: u8 = 15;
pub const PROGRESS_INFERENCE_CAP: u8 = 30;
pub const PROGRESS_INFERENCE_COMPLETE: u8 = 35;
pub const PROGRESS_FULL_RESPONSE: u8 = 40;
pub const PROGRESS_KEYWORD_BASE: u8 = 35;
pub const PROGRESS_PHASE1_CEILING: u8 = 49;
pub const PROGRESS_PHASE2_START: u8 = 50;
pub const PROGRESS_SEARCH_ISSUED: u8 = 60;
pub const PROGRESS_SEARCH_CHECKPOINTS: &[u8] = &[70, 80, 90];
pub const PROGRESS_DONE: u8 = 100;

// Inference progress grows by this many percent per received character
pub const INFERENCE_PROGRESS_PER_CHAR: f32 = 0.05;

// Status messages
pub const MSG_PHASE1_START: &str = "AI is starting its analysis...";
pub const MSG_INFERENCE: &str = "AI inference in progress...";
pub const MSG_FULL_RESPONSE: &str = "Analysis finished. Starting similarity search...";
pub const MSG_SEARCH_START: &str = "Running similarity search over showcases...";
pub const MSG_SEARCH_CHECKPOINTS: &[&str] = &[
    "Generating embedding vectors...",
    "Computing similarity scores...",
    "Selecting the best matching showcases...",
];
pub const MSG_CACHE_LOADED: &str = "Loaded cached results!";
