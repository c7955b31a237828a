//! V001: executions, pattern_stats, parameters, parameter_history.

pub const MIGRATION_SQL: &str = r#"
-- One row per (rule, action) evaluation. Append-only; purged by retention.
CREATE TABLE IF NOT EXISTS executions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    rule TEXT NOT NULL,
    category TEXT NOT NULL,
    action_id TEXT NOT NULL,
    action_hash TEXT NOT NULL,
    outcome TEXT NOT NULL,
    status TEXT NOT NULL,
    latency_ms REAL NOT NULL,
    error TEXT,
    pattern_key TEXT,
    ts INTEGER NOT NULL
) STRICT;

CREATE INDEX IF NOT EXISTS idx_executions_rule_ts ON executions(rule, ts);
CREATE INDEX IF NOT EXISTS idx_executions_ts ON executions(ts);
CREATE INDEX IF NOT EXISTS idx_executions_action ON executions(action_id);

-- Confusion-matrix counters per (rule, pattern). Upsert-with-increment only.
CREATE TABLE IF NOT EXISTS pattern_stats (
    rule TEXT NOT NULL,
    pattern_key TEXT NOT NULL,
    tp INTEGER NOT NULL DEFAULT 0,
    fp INTEGER NOT NULL DEFAULT 0,
    tn INTEGER NOT NULL DEFAULT 0,
    fn INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (rule, pattern_key)
) STRICT;

-- Current parameter values. `kind` is numeric | categorical.
CREATE TABLE IF NOT EXISTS parameters (
    name TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
) STRICT;

CREATE TABLE IF NOT EXISTS parameter_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    old_value TEXT,
    new_value TEXT NOT NULL,
    reason TEXT NOT NULL,
    confidence REAL NOT NULL,
    ts INTEGER NOT NULL
) STRICT;

CREATE INDEX IF NOT EXISTS idx_parameter_history_name_ts ON parameter_history(name, ts);
"#;
