//! # warden-runtime
//!
//! Owns one of everything: the learning store, the parameter store, the
//! execution engine, the tuner and its background loops. The operator
//! interface lives here as plain methods.

pub mod runtime;

pub use runtime::{WardenRuntime, IN_MEMORY_DB};
