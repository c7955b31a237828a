//! SQL query modules, one per table family. Every function takes a borrowed
//! connection so it runs unchanged inside a transaction.

pub mod executions;
pub mod metrics;
pub mod parameters;
pub mod patterns;
pub mod proposals;
