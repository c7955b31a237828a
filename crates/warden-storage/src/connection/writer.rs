//! Write connection utilities: BEGIN IMMEDIATE transactions.

use rusqlite::{Connection, Transaction};

use warden_core::errors::StorageError;

use crate::to_storage_err;

/// Execute a write operation inside a BEGIN IMMEDIATE transaction.
/// The write lock is taken at transaction start, so a second writer
/// connection waits on busy_timeout instead of failing mid-transaction.
pub fn with_immediate_transaction<F, T>(conn: &Connection, f: F) -> Result<T, StorageError>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, StorageError>,
{
    conn.execute_batch("BEGIN IMMEDIATE")
        .map_err(|e| to_storage_err(format!("failed to begin immediate transaction: {e}")))?;

    // BEGIN was issued above; unchecked_transaction only wraps it so that an
    // early return rolls back on drop.
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("failed to wrap transaction: {e}")))?;

    let result = f(&tx)?;

    tx.commit()
        .map_err(|e| to_storage_err(format!("failed to commit: {e}")))?;
    Ok(result)
}
