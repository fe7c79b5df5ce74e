//! palaver-utils: Common utilities shared across palaver crates
//!
//! Provides the unified error type, logging setup, and XDG path helpers.

pub mod error;
pub mod logging;
pub mod paths;

pub use error::{PalaverError, Result};
pub use logging::{init_logging, init_logging_with_config, LogConfig, LogOutput};
