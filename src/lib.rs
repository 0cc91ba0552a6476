// Veil - Metadata-driven anonymization engine
// Copyright (c) 2025 Veil Contributors
// Licensed under the MIT License

//! # Veil - Metadata-driven anonymization
//!
//! Veil rewrites the fields of in-memory records and object graphs with
//! synthetic values, following per-field rules registered for each entity
//! type.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Resolving** field rules per entity type
//! - **Generating** fake values by pattern name, optionally unique
//! - **Evaluating** `@=` expressions against the entity being anonymized
//! - **Coercing** values to each field's declared type
//! - **Auditing** every anonymized entity without logging plaintext values
//!
//! ## Architecture
//!
//! - [`anonymization`] - Engine, rule metadata, coercion, hooks and audit
//! - [`generator`] - Value generators and the uniqueness registry
//! - [`expression`] - The small expression language behind `@=` values
//! - [`domain`] - Values, entities, field rules and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust
//! use veil::anonymization::{Anonymizer, RuleRegistry};
//! use veil::domain::{FieldRule, Record, Value};
//! use veil::generator::FakerGenerator;
//!
//! # fn main() -> veil::domain::Result<()> {
//! let rules = RuleRegistry::new()
//!     .rule("Customer", "email", FieldRule::faker("safeEmail").unique())
//!     .rule("Customer", "code", FieldRule::fixed("@=object.getId()")?)
//!     .rule("Customer", "note", FieldRule::clear());
//!
//! let anonymizer = Anonymizer::builder(rules)
//!     .generator(FakerGenerator::seeded(7))
//!     .build();
//!
//! let customer = Record::new("Customer")
//!     .with("id", 42)
//!     .with("email", "jane@example.com")
//!     .with("code", "ABC")
//!     .with("note", "VIP")
//!     .into_ref();
//!
//! anonymizer.anonymize(&customer)?;
//! assert_eq!(customer.borrow().get("code"), Some(Value::Int(42)));
//! assert_eq!(customer.borrow().get("note"), Some(Value::Null));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Veil uses the [`domain::VeilError`] type for all errors. A failed pass is
//! not rolled back: fields written before the error keep their new values.
//!
//! ```rust,no_run
//! use veil::domain::VeilError;
//!
//! fn example() -> Result<(), VeilError> {
//!     let config = veil::config::load_config("veil.toml")?;
//!     println!("locale: {}", config.anonymizer.locale);
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Veil uses structured logging with the `tracing` crate. Install a
//! subscriber with [`logging::init_logging`] or any other `tracing`
//! subscriber.

pub mod anonymization;
pub mod config;
pub mod domain;
pub mod expression;
pub mod generator;
pub mod logging;
