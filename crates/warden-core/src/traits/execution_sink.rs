use crate::models::ExecutionRecord;

/// Fire-and-forget destination for execution records.
///
/// Implementations must return without waiting on persistence, and must log
/// and swallow their own failures.
pub trait IExecutionSink: Send + Sync {
    fn record_execution(&self, record: ExecutionRecord);
}
