//! Logging and observability
//!
//! Structured logging through `tracing`: a console layer plus an optional
//! JSON file layer with rotation. The engine emits events under the `veil`
//! target; the audit trail lives in [`crate::anonymization::audit`].
//!
//! # Example
//!
//! ```no_run
//! use veil::config::LoggingConfig;
//! use veil::logging::init_logging;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, parse_log_level, LoggingGuard};
