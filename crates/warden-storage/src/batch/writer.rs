//! BatchWriter: bounded crossbeam channel drained by a dedicated thread.
//!
//! Commands are grouped into batches of up to `batch_size` and committed in
//! one BEGIN IMMEDIATE transaction. If a batch fails it is replayed one
//! command at a time so a single bad row costs only itself.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use chrono::Utc;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use rusqlite::Connection;

use warden_core::constants::MAX_WRITE_BATCH;
use warden_core::errors::StorageError;
use warden_core::models::ExecutionRecord;
use warden_core::traits::IExecutionSink;
use warden_observability::events;

use super::commands::{WriteCommand, WriteStats};
use crate::connection::writer::with_immediate_transaction;
use crate::connection::DatabaseManager;
use crate::queries::{executions, parameters, patterns};
use crate::to_storage_err;

pub struct BatchWriter {
    tx: Sender<WriteCommand>,
    handle: Mutex<Option<JoinHandle<WriteStats>>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl BatchWriter {
    /// Spawn the writer thread. `capacity` bounds the queue; `batch_size` is
    /// clamped to `1..=MAX_WRITE_BATCH`.
    pub fn new(
        db: Arc<DatabaseManager>,
        capacity: usize,
        batch_size: usize,
    ) -> Result<Self, StorageError> {
        let capacity = capacity.max(1);
        let batch_size = batch_size.clamp(1, MAX_WRITE_BATCH);
        let (tx, rx) = bounded(capacity);
        let handle = thread::Builder::new()
            .name("warden-batch-writer".to_string())
            .spawn(move || writer_loop(&db, &rx, batch_size))
            .map_err(|e| to_storage_err(format!("spawn batch writer: {e}")))?;
        Ok(Self {
            tx,
            handle: Mutex::new(Some(handle)),
            capacity,
            dropped: AtomicU64::new(0),
        })
    }

    fn enqueue(&self, command: WriteCommand) -> Result<(), (StorageError, WriteCommand)> {
        self.tx.try_send(command).map_err(|e| {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            match e {
                TrySendError::Full(command) => (
                    StorageError::WriterBackpressure {
                        capacity: self.capacity,
                    },
                    command,
                ),
                TrySendError::Disconnected(command) => (StorageError::WriterClosed, command),
            }
        })
    }

    /// Queue a command without blocking. A full queue rejects it.
    pub fn try_send(&self, command: WriteCommand) -> Result<(), StorageError> {
        self.enqueue(command).map_err(|(err, _)| err)
    }

    /// Queue a command, blocking while the queue is full.
    pub fn send(&self, command: WriteCommand) -> Result<(), StorageError> {
        self.tx
            .send(command)
            .map_err(|_| StorageError::WriterClosed)
    }

    /// Block until everything queued before this call is committed.
    pub fn flush(&self) -> Result<(), StorageError> {
        let (ack_tx, ack_rx) = bounded(1);
        self.send(WriteCommand::Flush(ack_tx))?;
        ack_rx.recv().map_err(|_| StorageError::WriterClosed)
    }

    /// Commit pending work, stop the thread, and return its counters.
    pub fn shutdown(&self) -> Result<WriteStats, StorageError> {
        let handle = self
            .handle
            .lock()
            .map_err(|_| to_storage_err("batch writer handle lock poisoned"))?
            .take()
            .ok_or(StorageError::WriterClosed)?;
        // The thread may already be gone if it panicked; join reports that.
        let _ = self.tx.send(WriteCommand::Shutdown);
        handle
            .join()
            .map_err(|_| to_storage_err("batch writer thread panicked"))
    }

    /// Commands rejected because the queue was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn pending(&self) -> usize {
        self.tx.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl IExecutionSink for BatchWriter {
    fn record_execution(&self, record: ExecutionRecord) {
        if let Err((err, command)) = self.enqueue(WriteCommand::InsertExecution(record)) {
            if let WriteCommand::InsertExecution(record) = command {
                events::execution_write_failed(
                    &record.rule,
                    &record.action_id,
                    record.latency_ms,
                    &err.to_string(),
                );
            }
        }
    }
}

impl Drop for BatchWriter {
    fn drop(&mut self) {
        let handle = match self.handle.get_mut() {
            Ok(handle) => handle.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            let _ = self.tx.send(WriteCommand::Shutdown);
            let _ = handle.join();
        }
    }
}

fn writer_loop(db: &DatabaseManager, rx: &Receiver<WriteCommand>, batch_size: usize) -> WriteStats {
    let mut stats = WriteStats::default();
    let mut buffer: Vec<WriteCommand> = Vec::with_capacity(batch_size);
    let mut acks: Vec<Sender<()>> = Vec::new();
    let mut shutting_down = false;

    loop {
        let first = if shutting_down {
            // Drain whatever was queued before the shutdown was observed.
            match rx.try_recv() {
                Ok(command) => command,
                Err(_) => break,
            }
        } else {
            match rx.recv() {
                Ok(command) => command,
                Err(_) => break,
            }
        };

        let mut next = Some(first);
        while let Some(command) = next.take() {
            match command {
                WriteCommand::Flush(ack) => acks.push(ack),
                WriteCommand::Shutdown => shutting_down = true,
                other => buffer.push(other),
            }
            if buffer.len() >= batch_size {
                break;
            }
            next = rx.try_recv().ok();
        }

        commit(db, &mut buffer, &mut stats);
        for ack in acks.drain(..) {
            let _ = ack.send(());
        }
    }

    commit(db, &mut buffer, &mut stats);
    for ack in acks.drain(..) {
        let _ = ack.send(());
    }
    stats
}

fn commit(db: &DatabaseManager, buffer: &mut Vec<WriteCommand>, stats: &mut WriteStats) {
    if buffer.is_empty() {
        return;
    }

    let batch = db.with_writer(|conn| {
        with_immediate_transaction(conn, |tx| {
            let mut counts = WriteStats::default();
            for command in buffer.iter() {
                apply(tx, command, &mut counts)?;
            }
            Ok(counts)
        })
    });

    match batch {
        Ok(counts) => {
            stats.executions += counts.executions;
            stats.pattern_deltas += counts.pattern_deltas;
            stats.parameter_defaults += counts.parameter_defaults;
            stats.batches += 1;
        }
        Err(err) => {
            stats.failed_batches += 1;
            events::batch_write_failed(buffer.len(), &err.to_string());
            for command in buffer.iter() {
                let mut counts = WriteStats::default();
                match db.with_writer(|conn| apply(conn, command, &mut counts)) {
                    Ok(()) => {
                        stats.executions += counts.executions;
                        stats.pattern_deltas += counts.pattern_deltas;
                        stats.parameter_defaults += counts.parameter_defaults;
                    }
                    Err(err) => report_failure(command, &err),
                }
            }
        }
    }
    buffer.clear();
}

fn apply(
    conn: &Connection,
    command: &WriteCommand,
    counts: &mut WriteStats,
) -> Result<(), StorageError> {
    match command {
        WriteCommand::InsertExecution(record) => {
            executions::insert_execution(conn, record)?;
            counts.executions += 1;
        }
        WriteCommand::ApplyPatternDelta {
            rule,
            pattern,
            delta,
        } => {
            patterns::apply_delta(conn, rule, pattern, delta, Utc::now())?;
            counts.pattern_deltas += 1;
        }
        WriteCommand::InsertParameterDefault { name, value } => {
            parameters::insert_default(conn, name, value, Utc::now())?;
            counts.parameter_defaults += 1;
        }
        WriteCommand::Flush(_) | WriteCommand::Shutdown => {}
    }
    Ok(())
}

fn report_failure(command: &WriteCommand, err: &StorageError) {
    match command {
        WriteCommand::InsertExecution(record) => events::execution_write_failed(
            &record.rule,
            &record.action_id,
            record.latency_ms,
            &err.to_string(),
        ),
        other => events::persistence_write_failed(&other.describe(), &err.to_string()),
    }
}
