//! Configuration system for Warden.
//! TOML-based, layered resolution: env > project > defaults.

pub mod ab_test_config;
pub mod defaults;
pub mod engine_config;
pub mod observability_config;
pub mod storage_config;
pub mod tuner_config;
pub mod warden_config;

pub use ab_test_config::AbTestConfig;
pub use engine_config::{EngineConfig, TimeoutPolicy};
pub use observability_config::ObservabilityConfig;
pub use storage_config::StorageConfig;
pub use tuner_config::TunerConfig;
pub use warden_config::WardenConfig;
