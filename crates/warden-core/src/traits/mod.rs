pub mod execution_sink;
pub mod parameter_provider;
pub mod rule;

pub use execution_sink::IExecutionSink;
pub use parameter_provider::{IParameterProvider, ResolvedParameter};
pub use rule::IRule;
