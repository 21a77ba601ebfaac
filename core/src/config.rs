//! Configuration payloads and the processor that applies them

/// Rejection reasons
pub mod error;
/// Payload shapes and validation
pub mod payload;
pub mod processor;

#[cfg(test)]
mod payload_tests;

pub use error::ConfigError;
pub use payload::{BridgeConfig, ConfigRequest};
pub use processor::{ConfigurationProcessor, ProcessorState};
