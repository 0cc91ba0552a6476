//! Anonymization module for Veil
//!
//! This module rewrites entity graphs according to per-field rules.
//!
//! # Architecture
//!
//! The pipeline consists of:
//! - **Metadata**: resolves the field rules of an entity type
//! - **Strategy**: turns a rule into a value (fixed, expression, unique or generated)
//! - **Writer**: coerces values to the field's declared kind
//! - **Engine**: walks the graph, recursing into nested entities and collections
//! - **Hooks**: before/after notifications per entity, including the audit logger
//!
//! # Usage
//!
//! ```rust
//! use veil::anonymization::{Anonymizer, RuleRegistry};
//! use veil::domain::{FieldRule, Record};
//!
//! let rules = RuleRegistry::new().rule("Customer", "lastName", FieldRule::faker("lastName"));
//! let anonymizer = Anonymizer::new(rules);
//!
//! let customer = Record::new("Customer").with("lastName", "Doe").into_ref();
//! anonymizer.anonymize(&customer)?;
//! # Ok::<(), veil::domain::VeilError>(())
//! ```

pub mod audit;
pub mod engine;
pub mod hooks;
pub mod metadata;
mod strategy;
pub mod writer;

// Re-export main types
pub use audit::AuditLogger;
pub use engine::{AnonymizeOptions, Anonymizer, AnonymizerBuilder, DEFAULT_MAX_RETRIES};
pub use hooks::{AfterAnonymize, AnonymizeHooks, BeforeAnonymize, HookDispatcher, NoopHooks};
pub use metadata::{MetadataResolver, ResolverChain, RuleRegistry};
pub use writer::TypeCoercionWriter;
