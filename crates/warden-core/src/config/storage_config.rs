use serde::{Deserialize, Serialize};

use super::defaults;

/// Learning store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    pub db_path: String,
    /// Number of read connections in the pool.
    pub read_pool_size: usize,
    /// Pending writes the batch writer buffers before dropping new ones.
    pub writer_queue_capacity: usize,
    /// Writes committed per transaction.
    pub writer_batch_size: usize,
    /// Execution records older than this are purged.
    pub retention_days: u32,
    /// Interval between retention purges (seconds).
    pub purge_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: defaults::DEFAULT_DB_FILENAME.to_string(),
            read_pool_size: defaults::DEFAULT_READ_POOL_SIZE,
            writer_queue_capacity: defaults::DEFAULT_WRITER_QUEUE_CAPACITY,
            writer_batch_size: defaults::DEFAULT_WRITER_BATCH_SIZE,
            retention_days: defaults::DEFAULT_RETENTION_DAYS,
            purge_interval_secs: defaults::DEFAULT_PURGE_INTERVAL_SECS,
        }
    }
}
