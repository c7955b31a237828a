//! Batch writer: crossbeam-channel bounded queue, dedicated writer thread.

pub mod commands;
pub mod writer;

pub use commands::{WriteCommand, WriteStats};
pub use writer::BatchWriter;
