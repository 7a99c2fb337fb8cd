//! Configuration models and layered config loading.
//!
//! Owns the hostmcp config schema, validation and the JSON5 layer merge used
//! by the binary and the embedding API.

mod error;
mod loader;
mod model;

/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Layered config types and loader options.
pub use loader::{ConfigLayer, ConfigLayerSource, LayeredConfig, LayeredConfigOptions};
/// Configuration schema models.
pub use model::*;
