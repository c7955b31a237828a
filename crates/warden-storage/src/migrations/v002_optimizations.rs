//! V002: optimization_proposals, rollbacks.

pub const MIGRATION_SQL: &str = r#"
-- Values, stats and scope are JSON; state follows
-- proposed -> applied -> monitoring -> accepted | rolled_back.
CREATE TABLE IF NOT EXISTS optimization_proposals (
    id TEXT PRIMARY KEY,
    parameter TEXT NOT NULL,
    kind TEXT NOT NULL,
    old_value TEXT NOT NULL,
    new_value TEXT NOT NULL,
    confidence REAL NOT NULL,
    rationale TEXT NOT NULL,
    stats_json TEXT NOT NULL,
    scope_json TEXT NOT NULL,
    state TEXT NOT NULL,
    baseline_success_rate REAL,
    created_at INTEGER NOT NULL,
    applied_at INTEGER,
    resolved_at INTEGER
) STRICT;

CREATE INDEX IF NOT EXISTS idx_proposals_state ON optimization_proposals(state);
CREATE INDEX IF NOT EXISTS idx_proposals_parameter ON optimization_proposals(parameter);

CREATE TABLE IF NOT EXISTS rollbacks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    proposal_id TEXT NOT NULL,
    parameter TEXT NOT NULL,
    restored_value TEXT NOT NULL,
    abandoned_value TEXT NOT NULL,
    baseline_success_rate REAL NOT NULL,
    observed_success_rate REAL NOT NULL,
    degradation REAL NOT NULL,
    ts INTEGER NOT NULL
) STRICT;

CREATE INDEX IF NOT EXISTS idx_rollbacks_parameter ON rollbacks(parameter);
"#;
