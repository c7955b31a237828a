// Single source of truth for all default values.

// --- Engine ---
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_MAX_PARALLEL_RULES: usize = 16;

// --- Storage ---
pub const DEFAULT_DB_FILENAME: &str = "warden.db";
pub const DEFAULT_READ_POOL_SIZE: usize = 4;
pub const DEFAULT_WRITER_QUEUE_CAPACITY: usize = 10_000;
pub const DEFAULT_WRITER_BATCH_SIZE: usize = 128;
pub const DEFAULT_RETENTION_DAYS: u32 = 30;
pub const DEFAULT_PURGE_INTERVAL_SECS: u64 = 3_600; // 1 hour

// --- Tuner ---
pub const DEFAULT_TUNER_ENABLED: bool = true;
pub const DEFAULT_TUNER_INTERVAL_SECS: u64 = 900; // 15 minutes
pub const DEFAULT_COOLDOWN_SECS: u64 = 3_600;
pub const DEFAULT_MAX_CHANGE_RATE: f64 = 0.2;
pub const DEFAULT_NOISE_THRESHOLD: f64 = 0.05;
pub const DEFAULT_TIMEOUT_FLOOR_MS: f64 = 100.0;
pub const DEFAULT_TIMEOUT_SAMPLE_SIZE: usize = 100;
pub const DEFAULT_MIN_TIMEOUT_SAMPLES: usize = 50;
pub const DEFAULT_P95_MULTIPLIER: f64 = 1.2;
pub const DEFAULT_STDDEV_MULTIPLIER: f64 = 3.0;
pub const DEFAULT_MIN_PATTERN_SAMPLES: u64 = 20;
pub const DEFAULT_PRECISION_THRESHOLD: f64 = 0.7;
pub const DEFAULT_RECALL_THRESHOLD: f64 = 0.7;
pub const DEFAULT_FALSE_POSITIVE_RATE_THRESHOLD: f64 = 0.2;
pub const DEFAULT_FALSE_NEGATIVE_RATE_THRESHOLD: f64 = 0.2;
pub const DEFAULT_STRICTNESS_WINDOW_SECS: u64 = 3_600;
pub const DEFAULT_STRICTNESS_DELTA: f64 = 0.10;
pub const DEFAULT_STRICTNESS_HEADROOM: f64 = 0.95;
pub const DEFAULT_MIN_STRICTNESS_SAMPLES: u64 = 50;
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;
pub const DEFAULT_MONITOR_WINDOW_SECS: u64 = 1_800;
pub const DEFAULT_ROLLBACK_THRESHOLD: f64 = 0.05;
pub const DEFAULT_MIN_MONITOR_SAMPLES: u64 = 20;
pub const DEFAULT_DRY_RUN: bool = false;

// --- A/B tests ---
pub const DEFAULT_MIN_SAMPLES_PER_ARM: u64 = 100;
pub const DEFAULT_AB_DURATION_SECS: u64 = 86_400; // 1 day
pub const DEFAULT_SAMPLE_RATIO: f64 = 0.5;
pub const DEFAULT_SUCCESS_MARGIN: f64 = 0.05;
pub const DEFAULT_LATENCY_IMPROVEMENT: f64 = 0.10;

// --- Observability ---
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_JSON_LOGS: bool = true;
