//! Commands accepted by the batch writer.

use crossbeam_channel::Sender;

use warden_core::models::{ExecutionRecord, ParameterValue, PatternDelta, PatternKey};

/// One unit of work for the writer thread.
#[derive(Debug)]
pub enum WriteCommand {
    InsertExecution(ExecutionRecord),
    ApplyPatternDelta {
        rule: String,
        pattern: PatternKey,
        delta: PatternDelta,
    },
    /// Persist a first-use default. Never overwrites an existing value.
    InsertParameterDefault {
        name: String,
        value: ParameterValue,
    },
    /// Commit everything queued so far, then acknowledge.
    Flush(Sender<()>),
    Shutdown,
}

impl WriteCommand {
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::InsertExecution(record) => {
                format!("execution {} / {}", record.rule, record.action_id)
            }
            Self::ApplyPatternDelta { rule, pattern, .. } => {
                format!("pattern delta {rule} / {pattern}")
            }
            Self::InsertParameterDefault { name, .. } => format!("parameter default {name}"),
            Self::Flush(_) => "flush".to_string(),
            Self::Shutdown => "shutdown".to_string(),
        }
    }
}

/// Counters returned when the writer shuts down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub executions: u64,
    pub pattern_deltas: u64,
    pub parameter_defaults: u64,
    pub batches: u64,
    pub failed_batches: u64,
}
