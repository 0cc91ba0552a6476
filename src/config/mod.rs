//! Configuration management for Veil.
//!
//! This module provides TOML-based configuration loading, parsing, and
//! validation.
//!
//! # Overview
//!
//! Veil uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `VEIL_<SECTION>_<KEY>` environment overrides
//! - Default values for every setting
//! - Validation on load
//!
//! # Configuration Structure
//!
//! - [`AnonymizerConfig`] - Retry budget, reset flag, seed and locale
//! - [`AuditConfig`] - Audit trail file and format
//! - [`LoggingConfig`] - Log level and local file logging
//!
//! # Example Configuration
//!
//! ```toml
//! [anonymizer]
//! max_retries = 10000
//! reset = false
//! seed = 42
//! locale = "en"
//!
//! [audit]
//! enabled = true
//! log_path = "${VEIL_AUDIT_DIR}/anonymization.log"
//! json_format = true
//!
//! [logging]
//! level = "info"
//! local_enabled = true
//! local_path = "./logs"
//! local_rotation = "daily"
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use veil::anonymization::{Anonymizer, RuleRegistry};
//! use veil::config::load_config;
//!
//! # fn example() -> veil::domain::Result<()> {
//! let config = load_config("veil.toml")?;
//! let anonymizer = Anonymizer::from_config(&config, RuleRegistry::new())?;
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{AnonymizerConfig, AuditConfig, LoggingConfig, VeilConfig};
